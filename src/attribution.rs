//! Local, instance-specific attribution of a classifier decision.
//!
//! The raw text is split into distinct lower-cased words. Random subsets of
//! those words are removed, each perturbed text is re-scored through the
//! model, and a weighted ridge regression fitted on the on/off masks
//! approximates the model around the original input. Its coefficients are
//! the per-word contributions.
//!
//! All masks are drawn up front from a seeded RNG, so a given seed always
//! yields the same explanation even though scoring runs on the rayon pool.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};
use crate::model::ProbabilityModel;
use crate::models::ClassLabel;

const RIDGE_ALPHA: f64 = 1.0;

/// Sampling and surrogate settings. Every field has a default, so a partial
/// `[attribution]` config section is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionParams {
    /// How many of the most probable labels to explain.
    pub top_labels: usize,
    /// Words kept in each surrogate.
    pub num_features: usize,
    /// Perturbed samples, including the unperturbed original.
    pub num_samples: usize,
    pub kernel_width: f64,
    pub seed: u64,
}

impl Default for AttributionParams {
    fn default() -> Self {
        Self {
            top_labels: 1,
            num_features: 8,
            num_samples: 1000,
            kernel_width: 25.0,
            seed: 42,
        }
    }
}

/// Surrogate explanation for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub label: ClassLabel,
    /// Model probability of `label` for the unperturbed text.
    pub probability: f64,
    pub intercept: f64,
    /// Surrogate prediction for the unperturbed text.
    pub local_prediction: f64,
    /// Weighted R² of the surrogate on the perturbation samples.
    pub score: f64,
    /// `(word, weight)`, strongest absolute weight first.
    pub fragments: Vec<(String, f64)>,
}

/// Explain the model's decision on `raw` for its `top_labels` most probable labels.
///
/// Model errors are returned unchanged. Text without any word yields results
/// with no fragments whose intercept is the model probability.
pub fn attribute<M>(raw: &str, model: &M, params: &AttributionParams) -> Result<Vec<AttributionResult>>
where
    M: ProbabilityModel + ?Sized,
{
    if params.num_samples == 0 {
        return Err(FaiscError::Input(
            "attribution needs at least one sample".into(),
        ));
    }

    let (segments, features) = segment(raw);
    let d = features.len();
    let labels = model.labels();

    let masks = draw_masks(d, params.num_samples, params.seed);
    let texts: Vec<String> = masks.iter().map(|m| render(&segments, m)).collect();

    tracing::debug!(
        features = d,
        samples = texts.len(),
        seed = params.seed,
        "scoring perturbed texts"
    );

    let predictions: Vec<Vec<f64>> = texts
        .par_iter()
        .map(|text| model.predict_proba(text))
        .collect::<Result<Vec<_>>>()?;

    if let Some(bad) = predictions.iter().find(|p| p.len() != labels.len()) {
        return Err(FaiscError::ModelIntegrity(format!(
            "model returned {} probabilities for {} labels",
            bad.len(),
            labels.len()
        )));
    }

    let original = &predictions[0];
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        original[b]
            .partial_cmp(&original[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let weights: Vec<f64> = masks
        .iter()
        .map(|m| kernel(cosine_distance(m) * 100.0, params.kernel_width))
        .collect();
    let x: Vec<Vec<f64>> = masks
        .iter()
        .map(|m| m.iter().map(|&on| if on { 1.0 } else { 0.0 }).collect())
        .collect();

    let mut results = Vec::with_capacity(params.top_labels.min(labels.len()));
    for &class in order.iter().take(params.top_labels) {
        let y: Vec<f64> = predictions.iter().map(|p| p[class]).collect();
        let probability = original[class];

        if d == 0 {
            results.push(AttributionResult {
                label: labels[class],
                probability,
                intercept: probability,
                local_prediction: probability,
                score: 0.0,
                fragments: Vec::new(),
            });
            continue;
        }

        let all: Vec<usize> = (0..d).collect();
        let full = fit_ridge(&x, &y, &weights, &all);
        let mut ranked: Vec<usize> = all.clone();
        ranked.sort_by(|&a, &b| {
            full.coef[b]
                .abs()
                .partial_cmp(&full.coef[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(params.num_features.min(d));

        let surrogate = fit_ridge(&x, &y, &weights, &ranked);
        let mut fragments: Vec<(String, f64)> = ranked
            .iter()
            .zip(&surrogate.coef)
            .map(|(&f, &w)| (features[f].clone(), w))
            .collect();
        fragments.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let local_prediction = surrogate.intercept + surrogate.coef.iter().sum::<f64>();
        let score = surrogate.r_squared(&x, &y, &weights, &ranked);

        tracing::debug!(
            label = %labels[class],
            probability,
            local_prediction,
            score,
            "fitted local surrogate"
        );

        results.push(AttributionResult {
            label: labels[class],
            probability,
            intercept: surrogate.intercept,
            local_prediction,
            score,
            fragments,
        });
    }

    Ok(results)
}

/// A piece of the raw text: either a word (with the index of its feature) or
/// the separator between words.
#[derive(Debug, Clone, PartialEq)]
struct Segment<'a> {
    text: &'a str,
    feature: Option<usize>,
}

/// Split `raw` into segments and the distinct lower-cased words they refer
/// to, in first-occurrence order.
fn segment(raw: &str) -> (Vec<Segment<'_>>, Vec<String>) {
    let mut pieces: Vec<(&str, bool)> = Vec::new();
    let mut start = 0;
    let mut in_word = false;
    for (i, c) in raw.char_indices() {
        let is_word = c.is_alphanumeric();
        if i > start && is_word != in_word {
            pieces.push((&raw[start..i], in_word));
            start = i;
        }
        in_word = is_word;
    }
    if start < raw.len() {
        pieces.push((&raw[start..], in_word));
    }

    let mut features: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let segments = pieces
        .into_iter()
        .map(|(text, is_word)| {
            let feature = is_word.then(|| {
                let key = text.to_lowercase();
                *index.entry(key.clone()).or_insert_with(|| {
                    features.push(key);
                    features.len() - 1
                })
            });
            Segment { text, feature }
        })
        .collect();
    (segments, features)
}

/// Sample 0 keeps every word; every other sample removes between 1 and `d`
/// distinct words.
fn draw_masks(d: usize, num_samples: usize, seed: u64) -> Vec<Vec<bool>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut masks = Vec::with_capacity(num_samples);
    masks.push(vec![true; d]);
    for _ in 1..num_samples {
        let mut mask = vec![true; d];
        if d > 0 {
            let removed = rng.gen_range(1..=d);
            for f in index::sample(&mut rng, d, removed) {
                mask[f] = false;
            }
        }
        masks.push(mask);
    }
    masks
}

/// Rebuild the text without the words switched off in `mask`.
fn render(segments: &[Segment<'_>], mask: &[bool]) -> String {
    segments
        .iter()
        .filter(|s| s.feature.map_or(true, |f| mask[f]))
        .map(|s| s.text)
        .collect()
}

/// Cosine distance between a mask and the all-ones mask.
fn cosine_distance(mask: &[bool]) -> f64 {
    let d = mask.len();
    let active = mask.iter().filter(|&&on| on).count();
    if d == 0 || active == 0 {
        return 1.0;
    }
    1.0 - (active as f64 / d as f64).sqrt()
}

fn kernel(distance: f64, width: f64) -> f64 {
    (-(distance * distance) / (width * width)).exp().sqrt()
}

struct RidgeFit {
    intercept: f64,
    /// One coefficient per selected feature, in selection order.
    coef: Vec<f64>,
}

impl RidgeFit {
    fn predict(&self, row: &[f64], cols: &[usize]) -> f64 {
        self.intercept
            + cols
                .iter()
                .zip(&self.coef)
                .map(|(&c, w)| row[c] * w)
                .sum::<f64>()
    }

    fn r_squared(&self, x: &[Vec<f64>], y: &[f64], w: &[f64], cols: &[usize]) -> f64 {
        let y_mean = weighted_mean(y.iter().copied(), w);
        let mut residual = 0.0;
        let mut total = 0.0;
        for ((row, &yi), &wi) in x.iter().zip(y).zip(w) {
            residual += wi * (yi - self.predict(row, cols)).powi(2);
            total += wi * (yi - y_mean).powi(2);
        }
        if total <= f64::EPSILON {
            return if residual <= f64::EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - residual / total
    }
}

/// Weighted ridge regression with an unpenalized intercept, restricted to `cols`.
fn fit_ridge(x: &[Vec<f64>], y: &[f64], w: &[f64], cols: &[usize]) -> RidgeFit {
    let m = cols.len();
    let y_mean = weighted_mean(y.iter().copied(), w);
    let x_mean: Vec<f64> = cols
        .iter()
        .map(|&c| weighted_mean(x.iter().map(|row| row[c]), w))
        .collect();

    // (Xcᵀ W Xc + αI) β = Xcᵀ W yc
    let mut a = vec![vec![0.0; m]; m];
    let mut b = vec![0.0; m];
    for ((row, &yi), &wi) in x.iter().zip(y).zip(w) {
        let centered: Vec<f64> = cols
            .iter()
            .zip(&x_mean)
            .map(|(&c, mean)| row[c] - mean)
            .collect();
        let yc = yi - y_mean;
        for i in 0..m {
            b[i] += wi * centered[i] * yc;
            for j in i..m {
                a[i][j] += wi * centered[i] * centered[j];
            }
        }
    }
    for i in 0..m {
        a[i][i] += RIDGE_ALPHA;
        for j in 0..i {
            a[i][j] = a[j][i];
        }
    }

    let coef = solve(a, b);
    let intercept = y_mean - coef.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
    RidgeFit { intercept, coef }
}

fn weighted_mean(values: impl Iterator<Item = f64>, w: &[f64]) -> f64 {
    let total: f64 = w.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values.zip(w).map(|(v, wi)| v * wi).sum::<f64>() / total
}

/// Gaussian elimination with partial pivoting. The ridge term keeps the
/// system positive definite, so a zero pivot only arises from degenerate
/// input and yields a zero coefficient.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let p = a[col][col];
        if p.abs() < 1e-12 {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / p;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let p = a[row][row];
        if p.abs() < 1e-12 {
            continue;
        }
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / p;
    }
    x
}
