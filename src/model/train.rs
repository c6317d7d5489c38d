use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};
use crate::ingredients::normalize::normalize;
use crate::model::artifact::TrainedModel;
use crate::model::corpus::LabeledExample;
use crate::model::metrics::Evaluation;
use crate::model::softmax::SoftmaxRegression;
use crate::model::split::stratified_split;
use crate::model::vectorizer::TfidfVectorizer;
use crate::models::ClassLabel;

/// Hyperparameters of the training run. Every field has a default, so a
/// partial `[training]` config section is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub test_fraction: f64,
    pub seed: u64,
    pub max_features: usize,
    pub min_df: usize,
    pub max_df: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub c: f64,
    pub tolerance: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.20,
            seed: 42,
            max_features: 20_000,
            min_df: 2,
            max_df: 0.95,
            max_iter: 600,
            learning_rate: 1.0,
            c: 1.0,
            tolerance: 1e-4,
        }
    }
}

/// A fitted model plus its held-out evaluation.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub evaluation: Evaluation,
    pub train_rows: usize,
    pub test_rows: usize,
    pub iterations: usize,
}

/// Train the TF-IDF + softmax pipeline.
///
/// Texts are normalized first; rows that normalize to nothing are dropped.
/// Fails with [`FaiscError::Data`] when no rows remain, fewer than two labels
/// are present, or a present label has fewer than two examples. `on_iter` is
/// called after each optimizer iteration with the iteration count.
pub fn train<F>(corpus: &[LabeledExample], params: &TrainingParams, on_iter: F) -> Result<TrainingOutcome>
where
    F: FnMut(usize),
{
    if corpus.is_empty() {
        return Err(FaiscError::Data("training corpus is empty".into()));
    }

    let mut texts: Vec<String> = Vec::with_capacity(corpus.len());
    let mut raw_labels: Vec<ClassLabel> = Vec::with_capacity(corpus.len());
    for example in corpus {
        let text = normalize(&example.ingredients);
        if text.is_empty() {
            continue;
        }
        texts.push(text);
        raw_labels.push(example.label);
    }

    let skipped = corpus.len() - texts.len();
    if skipped > 0 {
        tracing::warn!(skipped, "dropped rows whose ingredients normalize to empty text");
    }
    if texts.is_empty() {
        return Err(FaiscError::Data(
            "no usable rows after normalizing ingredient text".into(),
        ));
    }

    // Model classes: labels present in the data, in taxonomy order.
    let labels: Vec<ClassLabel> = ClassLabel::ALL
        .iter()
        .copied()
        .filter(|l| raw_labels.contains(l))
        .collect();
    if labels.len() < ClassLabel::ALL.len() {
        let missing: Vec<&str> = ClassLabel::ALL
            .iter()
            .filter(|l| !labels.contains(l))
            .map(|l| l.as_str())
            .collect();
        tracing::warn!(
            missing = %missing.join(", "),
            "corpus does not cover every label; the artifact will fail the taxonomy check at load"
        );
    }

    let y: Vec<usize> = raw_labels
        .iter()
        .map(|l| labels.iter().position(|c| c == l).unwrap_or(0))
        .collect();

    let split = stratified_split(&y, params.test_fraction, params.seed)?;
    let train_texts: Vec<&str> = split.train.iter().map(|&i| texts[i].as_str()).collect();
    let train_y: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();
    let test_texts: Vec<&str> = split.test.iter().map(|&i| texts[i].as_str()).collect();
    let test_y: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();

    tracing::info!(
        train = train_texts.len(),
        test = test_texts.len(),
        classes = labels.len(),
        "split corpus"
    );

    let mut vectorizer = TfidfVectorizer::new()
        .with_ngram_range(1, 2)
        .with_max_features(params.max_features)
        .with_min_df(params.min_df)
        .with_max_df(params.max_df);
    vectorizer.fit(&train_texts)?;
    let train_x = vectorizer.transform(&train_texts);

    let mut classifier = SoftmaxRegression::new(labels.len(), vectorizer.vocabulary_size())
        .with_learning_rate(params.learning_rate)
        .with_max_iter(params.max_iter)
        .with_tolerance(params.tolerance)
        .with_c(params.c);
    let iterations = classifier.fit(&train_x, &train_y, on_iter)?;

    let test_pred: Vec<usize> = vectorizer
        .transform(&test_texts)
        .iter()
        .map(|row| classifier.predict(row))
        .collect();
    let evaluation = Evaluation::from_predictions(&labels, &test_y, &test_pred);

    tracing::info!(
        accuracy = evaluation.accuracy,
        macro_f1 = evaluation.macro_avg.f1,
        iterations,
        "training finished"
    );

    Ok(TrainingOutcome {
        model: TrainedModel::new(&labels, vectorizer, classifier),
        evaluation,
        train_rows: train_texts.len(),
        test_rows: test_texts.len(),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::ModelHandle;
    use crate::model::testing::synthetic_corpus;
    use std::path::Path;

    #[test]
    fn test_train_full_taxonomy_round_trip() {
        let corpus = synthetic_corpus();
        let mut ticks = 0;
        let outcome = train(&corpus, &TrainingParams::default(), |_| ticks += 1).unwrap();

        assert_eq!(outcome.iterations, ticks);
        assert_eq!(outcome.train_rows + outcome.test_rows, corpus.len());
        assert_eq!(outcome.model.labels.len(), 10);
        assert_eq!(outcome.evaluation.confusion.len(), 10);
        assert!(outcome.evaluation.accuracy >= 0.9);

        let handle = ModelHandle::from_model(outcome.model, Path::new("mem")).unwrap();
        let result = handle.predict("Aqua, Phenoxyethanol, Methylparaben");
        assert_eq!(result.label, ClassLabel::Preservative);
        let sum: f64 = result.probabilities.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_training_is_reproducible() {
        let corpus = synthetic_corpus();
        let params = TrainingParams {
            max_iter: 20,
            ..TrainingParams::default()
        };
        let a = train(&corpus, &params, |_| {}).unwrap();
        let b = train(&corpus, &params, |_| {}).unwrap();
        assert_eq!(a.model.classifier, b.model.classifier);
        assert_eq!(a.model.vectorizer, b.model.vectorizer);
        assert_eq!(a.evaluation, b.evaluation);
    }

    #[test]
    fn test_partial_taxonomy_trains_but_fails_load() {
        let corpus: Vec<LabeledExample> = synthetic_corpus()
            .into_iter()
            .filter(|e| e.label != ClassLabel::Preservative)
            .collect();
        let outcome = train(&corpus, &TrainingParams::default(), |_| {}).unwrap();
        assert_eq!(outcome.model.labels.len(), 9);
        assert!(matches!(
            ModelHandle::from_model(outcome.model, Path::new("mem")),
            Err(FaiscError::ModelIntegrity(_))
        ));
    }

    #[test]
    fn test_empty_corpus_is_data_error() {
        assert!(matches!(
            train(&[], &TrainingParams::default(), |_| {}),
            Err(FaiscError::Data(_))
        ));
        let blank = [LabeledExample::new("***", ClassLabel::Safe)];
        assert!(matches!(
            train(&blank, &TrainingParams::default(), |_| {}),
            Err(FaiscError::Data(_))
        ));
    }

    #[test]
    fn test_single_label_is_data_error() {
        let corpus = vec![
            LabeledExample::new("aqua, glycerin", ClassLabel::Safe),
            LabeledExample::new("aqua, panthenol", ClassLabel::Safe),
            LabeledExample::new("aqua, niacinamide", ClassLabel::Safe),
        ];
        assert!(matches!(
            train(&corpus, &TrainingParams::default(), |_| {}),
            Err(FaiscError::Data(_))
        ));
    }

    #[test]
    fn test_singleton_class_is_data_error() {
        let mut corpus = synthetic_corpus();
        corpus.retain(|e| e.label != ClassLabel::Irritant);
        corpus.push(LabeledExample::new("menthol, aqua", ClassLabel::Irritant));
        assert!(matches!(
            train(&corpus, &TrainingParams::default(), |_| {}),
            Err(FaiscError::Data(_))
        ));
    }
}
