//! `faisc` — fungal-acne safety scoring and classification of cosmetic
//! ingredient lists.
//!
//! # Flow
//! 1. Normalize and tokenize the raw list ([`ingredients::normalize`]).
//! 2. Score it against the keyword table ([`ingredients::scorer`]).
//! 3. Classify it with the loaded TF-IDF + softmax model ([`model`]).
//! 4. Compose the narrative and per-ingredient highlighting ([`ingredients::explain`]).
//! 5. Optionally attribute the classifier decision to words ([`attribution`]).
//!
//! [`analyzer::Analyzer`] bundles the injected keyword table and model and
//! runs the whole flow.

pub mod analyzer;
pub mod attribution;
pub mod config;
pub mod error;
pub mod history;
pub mod ingredients;
pub mod model;
pub mod models;
pub mod report;

pub use analyzer::{AnalysisReport, Analyzer};
pub use error::{FaiscError, Result};
