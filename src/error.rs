//! Error types for the analysis core.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaiscError>;

#[derive(Debug, Error)]
pub enum FaiscError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Training data error: {0}")]
    Data(String),

    #[error("No trained model found at {}; run `faisc train` first", .0.display())]
    ModelUnavailable(PathBuf),

    #[error("No model was provided to the analyzer; classification needs a loaded model")]
    ModelNotLoaded,

    #[error("Model integrity check failed: {0}")]
    ModelIntegrity(String),

    #[error("Invalid keyword table: {0}")]
    Keywords(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
