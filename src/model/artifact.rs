use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{FaiscError, Result};
use crate::ingredients::normalize::normalize;
use crate::model::softmax::SoftmaxRegression;
use crate::model::vectorizer::TfidfVectorizer;
use crate::model::ProbabilityModel;
use crate::models::{ClassLabel, ClassificationResult};

pub const FORMAT_VERSION: u32 = 1;

/// Fitted feature extractor and classifier, persisted as one artifact.
///
/// `labels[i]` names class index `i` of the classifier. Labels are stored as
/// plain strings so that an artifact built for a different taxonomy still
/// deserializes and is then refused by the integrity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,
    pub labels: Vec<String>,
    pub vectorizer: TfidfVectorizer,
    pub classifier: SoftmaxRegression,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn new(
        labels: &[ClassLabel],
        vectorizer: TfidfVectorizer,
        classifier: SoftmaxRegression,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            labels: labels.iter().map(|l| l.as_str().to_string()).collect(),
            vectorizer,
            classifier,
            trained_at: Utc::now(),
        }
    }

    /// Atomically write the artifact as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent_dir)?;

        let temp_file = NamedTempFile::new_in(parent_dir)?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp_file.persist(path).map_err(|e| FaiscError::Io(e.error))?;

        tracing::info!(path = %path.display(), labels = self.labels.len(), "saved model artifact");
        Ok(())
    }

    /// Read an artifact without validating it.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FaiscError::ModelUnavailable(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Check the artifact against the expected 10-label taxonomy and its own
    /// internal dimensions, returning the class-ordered labels.
    pub fn validate(&self) -> Result<Vec<ClassLabel>> {
        if self.format_version != FORMAT_VERSION {
            return Err(FaiscError::ModelIntegrity(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        if self.labels.len() != ClassLabel::ALL.len() {
            return Err(FaiscError::ModelIntegrity(format!(
                "expected a {}-class model but the artifact has {} classes",
                ClassLabel::ALL.len(),
                self.labels.len()
            )));
        }

        let mut labels = Vec::with_capacity(self.labels.len());
        let mut seen = HashSet::new();
        for raw in &self.labels {
            let label: ClassLabel = raw.parse().map_err(|_| {
                FaiscError::ModelIntegrity(format!("artifact label '{}' is not in the taxonomy", raw))
            })?;
            if !seen.insert(label) {
                return Err(FaiscError::ModelIntegrity(format!(
                    "artifact lists label '{}' twice",
                    raw
                )));
            }
            labels.push(label);
        }

        self.vectorizer
            .check_consistency()
            .map_err(FaiscError::ModelIntegrity)?;
        self.classifier
            .check_consistency()
            .map_err(FaiscError::ModelIntegrity)?;

        if self.classifier.n_classes() != labels.len() {
            return Err(FaiscError::ModelIntegrity(format!(
                "classifier has {} outputs for {} labels",
                self.classifier.n_classes(),
                labels.len()
            )));
        }
        if self.classifier.n_features() != self.vectorizer.vocabulary_size() {
            return Err(FaiscError::ModelIntegrity(format!(
                "classifier expects {} features but the vocabulary has {}",
                self.classifier.n_features(),
                self.vectorizer.vocabulary_size()
            )));
        }

        Ok(labels)
    }
}

/// A loaded, validated model. Immutable; share it behind an `Arc`.
#[derive(Debug)]
pub struct ModelHandle {
    model: TrainedModel,
    labels: Vec<ClassLabel>,
    path: PathBuf,
}

impl ModelHandle {
    /// Load and validate the artifact at `path`.
    ///
    /// A missing file is [`FaiscError::ModelUnavailable`]; a wrong taxonomy or
    /// inconsistent parameters are [`FaiscError::ModelIntegrity`]. Both are
    /// raised here, before any prediction is served.
    pub fn load(path: &Path) -> Result<Self> {
        let model = TrainedModel::read(path)?;
        let handle = Self::from_model(model, path)?;
        tracing::info!(
            path = %path.display(),
            vocabulary = handle.model.vectorizer.vocabulary_size(),
            trained_at = %handle.model.trained_at,
            "loaded classification model"
        );
        Ok(handle)
    }

    /// Validate an in-memory model.
    pub fn from_model(model: TrainedModel, path: &Path) -> Result<Self> {
        let labels = model.validate()?;
        Ok(Self {
            model,
            labels,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Classify raw ingredient text. Pure and deterministic.
    pub fn predict(&self, text: &str) -> ClassificationResult {
        let probs = self.distribution(text);
        // validate() guarantees at least one label, so the arg-max exists
        ClassificationResult::from_distribution(&self.labels, &probs).unwrap_or_else(|| {
            ClassificationResult {
                label: self.labels[0],
                probabilities: self.labels.iter().map(|&l| (l, 0.0)).collect(),
            }
        })
    }

    fn distribution(&self, text: &str) -> Vec<f64> {
        let row = self.model.vectorizer.transform_one(&normalize(text));
        self.model.classifier.predict_proba(&row)
    }
}

impl ProbabilityModel for ModelHandle {
    fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>> {
        Ok(self.distribution(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::tiny_model;

    #[test]
    fn test_save_and_load_full_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        let model = tiny_model(&ClassLabel::ALL);
        model.save(&path).unwrap();

        let handle = ModelHandle::load(&path).unwrap();
        assert_eq!(handle.labels(), &ClassLabel::ALL);
        assert_eq!(handle.model().labels, model.labels);

        let result = handle.predict("Comedogenic, Aqua");
        assert_eq!(result.label, ClassLabel::Comedogenic);
        let sum: f64 = result.probabilities.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(result.probabilities.iter().all(|(_, p)| *p >= 0.0));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let handle = ModelHandle::from_model(tiny_model(&ClassLabel::ALL), Path::new("mem")).unwrap();
        let a = handle.predict("Irritant, Fragrance, Aqua");
        let b = handle.predict("Irritant, Fragrance, Aqua");
        assert_eq!(a, b);
    }

    #[test]
    fn test_nine_label_model_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        tiny_model(&ClassLabel::ALL[..9]).save(&path).unwrap();

        let err = ModelHandle::load(&path).unwrap_err();
        assert!(matches!(err, FaiscError::ModelIntegrity(_)));
    }

    #[test]
    fn test_unknown_or_duplicate_labels_fail_integrity() {
        let mut model = tiny_model(&ClassLabel::ALL);
        model.labels[3] = "greasy".into();
        assert!(matches!(model.validate(), Err(FaiscError::ModelIntegrity(_))));

        let mut model = tiny_model(&ClassLabel::ALL);
        model.labels[3] = "safe".into();
        assert!(matches!(model.validate(), Err(FaiscError::ModelIntegrity(_))));
    }

    fn tampered_artifact(edit: impl FnOnce(&mut serde_json::Value)) -> Result<ModelHandle> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut value = serde_json::to_value(tiny_model(&ClassLabel::ALL)).unwrap();
        edit(&mut value);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        ModelHandle::load(&path)
    }

    #[test]
    fn test_invalid_ngram_range_fails_at_load() {
        for range in [[0, 1], [2, 1]] {
            let result = tampered_artifact(|v| {
                v["vectorizer"]["ngram_range"] = serde_json::json!(range);
            });
            assert!(matches!(result, Err(FaiscError::ModelIntegrity(_))));
        }
    }

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelHandle::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FaiscError::ModelUnavailable(_)));
    }

    #[test]
    fn test_malformed_artifact_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = ModelHandle::load(&path).unwrap_err();
        assert!(matches!(err, FaiscError::Serialization(_)));
    }
}
