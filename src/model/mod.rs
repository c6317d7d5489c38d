//! Statistical classification pipeline.
//!
//! - [`corpus`] — CSV training-data loading.
//! - [`vectorizer`] — unigram+bigram TF-IDF features.
//! - [`softmax`] — multinomial logistic regression.
//! - [`split`] — seeded stratified train/test split.
//! - [`metrics`] — held-out precision/recall/F1 and confusion matrix.
//! - [`train`] — the offline training procedure tying the above together.
//! - [`artifact`] — persisted model and the integrity-checked [`ModelHandle`].

use crate::error::Result;
use crate::models::ClassLabel;

pub mod artifact;
pub mod corpus;
pub mod metrics;
pub mod softmax;
pub mod split;
pub mod train;
pub mod vectorizer;

pub use artifact::{ModelHandle, TrainedModel};

/// A black-box probability function over raw ingredient text.
///
/// Implementations normalize the text themselves. `predict_proba` returns one
/// probability per entry of [`labels`](ProbabilityModel::labels), in the same
/// order.
pub trait ProbabilityModel: Sync {
    fn labels(&self) -> &[ClassLabel];

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>>;
}
