use serde::{Deserialize, Serialize};

use crate::models::ClassLabel;

/// Precision, recall and F1 for one class on the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: ClassLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged metrics (macro or support-weighted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub labels: Vec<ClassLabel>,
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// `confusion[true][predicted]`, indexed like `labels`.
    pub confusion: Vec<Vec<usize>>,
    pub support: usize,
}

impl Evaluation {
    /// Build the report from class indices into `labels`.
    pub fn from_predictions(labels: &[ClassLabel], y_true: &[usize], y_pred: &[usize]) -> Self {
        let k = labels.len();
        let mut confusion = vec![vec![0usize; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < k && p < k {
                confusion[t][p] += 1;
            }
        }

        let per_class: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = confusion[i][i];
                let predicted: usize = confusion.iter().map(|row| row[i]).sum();
                let support: usize = confusion[i].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total: usize = per_class.iter().map(|m| m.support).sum();
        let correct: usize = (0..k).map(|i| confusion[i][i]).sum();

        let macro_avg = AverageMetrics {
            precision: mean(per_class.iter().map(|m| m.precision), k),
            recall: mean(per_class.iter().map(|m| m.recall), k),
            f1: mean(per_class.iter().map(|m| m.f1), k),
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class
                .iter()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
        };

        Evaluation {
            labels: labels.to_vec(),
            per_class,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            confusion,
            support: total,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_on_known_confusion() {
        let labels = [ClassLabel::Safe, ClassLabel::Irritant];
        // true: 0 0 0 1 1 ; pred: 0 0 1 1 0
        let eval = Evaluation::from_predictions(&labels, &[0, 0, 0, 1, 1], &[0, 0, 1, 1, 0]);

        assert_eq!(eval.confusion, vec![vec![2, 1], vec![1, 1]]);
        assert!((eval.accuracy - 0.6).abs() < 1e-12);

        let safe = &eval.per_class[0];
        assert!((safe.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((safe.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(safe.support, 3);

        let irritant = &eval.per_class[1];
        assert!((irritant.precision - 0.5).abs() < 1e-12);
        assert!((irritant.recall - 0.5).abs() < 1e-12);
        assert!((irritant.f1 - 0.5).abs() < 1e-12);

        let expected_weighted_f1 = (2.0 / 3.0 * 3.0 + 0.5 * 2.0) / 5.0;
        assert!((eval.weighted_avg.f1 - expected_weighted_f1).abs() < 1e-12);
    }

    #[test]
    fn test_unpredicted_class_has_zero_precision() {
        let labels = [ClassLabel::Safe, ClassLabel::Neutral];
        let eval = Evaluation::from_predictions(&labels, &[0, 1], &[0, 0]);
        assert_eq!(eval.per_class[1].precision, 0.0);
        assert_eq!(eval.per_class[1].f1, 0.0);
    }
}
