use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};
use crate::model::vectorizer::SparseRow;

/// Multinomial logistic regression over sparse features.
///
/// Minimizes mean cross-entropy plus an L2 penalty `||W||² / (2·C·n)` with
/// full-batch gradient descent. Intercepts are not penalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    n_classes: usize,
    n_features: usize,
    /// Row-major `n_classes × n_features`.
    weights: Vec<f64>,
    intercepts: Vec<f64>,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
    c: f64,
}

impl SoftmaxRegression {
    pub fn new(n_classes: usize, n_features: usize) -> Self {
        Self {
            n_classes,
            n_features,
            weights: vec![0.0; n_classes * n_features],
            intercepts: vec![0.0; n_classes],
            learning_rate: 1.0,
            max_iter: 600,
            tol: 1e-4,
            c: 1.0,
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Inverse regularization strength; smaller values regularize harder.
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fit on sparse rows with class indices in `0..n_classes`.
    ///
    /// `on_iter` is called once per completed iteration. Returns the number of
    /// iterations run.
    pub fn fit<F>(&mut self, x: &[SparseRow], y: &[usize], mut on_iter: F) -> Result<usize>
    where
        F: FnMut(usize),
    {
        if x.len() != y.len() {
            return Err(FaiscError::Data(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(FaiscError::Data("cannot fit classifier on zero samples".into()));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= self.n_classes) {
            return Err(FaiscError::Data(format!(
                "class index {} out of range for {} classes",
                bad, self.n_classes
            )));
        }
        if self.c <= 0.0 {
            return Err(FaiscError::Data("C must be positive".into()));
        }

        let n = x.len() as f64;
        let alpha = 1.0 / (self.c * n);
        let k = self.n_classes;
        let mut grad_w = vec![0.0; self.weights.len()];
        let mut grad_b = vec![0.0; k];
        let mut probs = vec![0.0; k];

        let mut iterations = 0;
        for iter in 0..self.max_iter {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            grad_b.iter_mut().for_each(|g| *g = 0.0);

            for (row, &label) in x.iter().zip(y) {
                self.distribution_into(row, &mut probs);
                for class in 0..k {
                    let err = probs[class] - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += err;
                    let base = class * self.n_features;
                    for &(j, v) in row {
                        grad_w[base + j] += err * v;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for (g, w) in grad_w.iter_mut().zip(&self.weights) {
                *g = *g / n + alpha * w;
                max_grad = max_grad.max(g.abs());
            }
            for g in &mut grad_b {
                *g /= n;
                max_grad = max_grad.max(g.abs());
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * g;
            }
            for (b, g) in self.intercepts.iter_mut().zip(&grad_b) {
                *b -= self.learning_rate * g;
            }

            iterations = iter + 1;
            on_iter(iterations);

            if max_grad < self.tol {
                tracing::debug!(iterations, max_grad, "softmax regression converged");
                break;
            }
        }

        Ok(iterations)
    }

    /// Class probabilities for one row.
    pub fn predict_proba(&self, row: &SparseRow) -> Vec<f64> {
        let mut probs = vec![0.0; self.n_classes];
        self.distribution_into(row, &mut probs);
        probs
    }

    /// Index of the most probable class (first maximum wins).
    pub fn predict(&self, row: &SparseRow) -> usize {
        let probs = self.predict_proba(row);
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }
        best
    }

    /// Internal consistency of a deserialized classifier.
    pub(crate) fn check_consistency(&self) -> std::result::Result<(), String> {
        if self.weights.len() != self.n_classes * self.n_features {
            return Err(format!(
                "weight matrix has {} entries, expected {} x {}",
                self.weights.len(),
                self.n_classes,
                self.n_features
            ));
        }
        if self.intercepts.len() != self.n_classes {
            return Err(format!(
                "{} intercepts for {} classes",
                self.intercepts.len(),
                self.n_classes
            ));
        }
        if self.weights.iter().chain(&self.intercepts).any(|w| !w.is_finite()) {
            return Err("non-finite model parameter".into());
        }
        Ok(())
    }

    fn distribution_into(&self, row: &SparseRow, out: &mut [f64]) {
        for (class, slot) in out.iter_mut().enumerate() {
            let base = class * self.n_features;
            let mut z = self.intercepts[class];
            for &(j, v) in row {
                if j < self.n_features {
                    z += self.weights[base + j] * v;
                }
            }
            *slot = z;
        }
        softmax_in_place(out);
    }
}

/// Numerically stable softmax.
pub fn softmax_in_place(logits: &mut [f64]) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for z in logits.iter_mut() {
        *z = (*z - max).exp();
        sum += *z;
    }
    if sum > 0.0 {
        for z in logits.iter_mut() {
            *z /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Vec<SparseRow>, Vec<usize>) {
        let x = vec![
            vec![(0, 1.0)],
            vec![(0, 0.9), (2, 0.1)],
            vec![(1, 1.0)],
            vec![(1, 0.8), (2, 0.2)],
            vec![(2, 1.0)],
            vec![(2, 0.9), (0, 0.1)],
        ];
        let x = x
            .into_iter()
            .map(|mut r| {
                r.sort_by_key(|(j, _)| *j);
                r
            })
            .collect();
        (x, vec![0, 0, 1, 1, 2, 2])
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut z = [1000.0, 1001.0, -5.0];
        softmax_in_place(&mut z);
        assert!((z.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(z.iter().all(|p| *p >= 0.0 && p.is_finite()));
    }

    #[test]
    fn test_untrained_model_is_uniform() {
        let m = SoftmaxRegression::new(4, 3);
        let p = m.predict_proba(&vec![(0, 1.0)]);
        assert!(p.iter().all(|v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_fit_separates_toy_classes() {
        let (x, y) = toy();
        let mut m = SoftmaxRegression::new(3, 3).with_c(100.0).with_max_iter(500);
        let mut calls = 0;
        let iters = m.fit(&x, &y, |_| calls += 1).unwrap();
        assert_eq!(iters, calls);
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(m.predict(row), label);
            let p = m.predict_proba(row);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy();
        let mut a = SoftmaxRegression::new(3, 3).with_max_iter(50);
        let mut b = SoftmaxRegression::new(3, 3).with_max_iter(50);
        a.fit(&x, &y, |_| {}).unwrap();
        b.fit(&x, &y, |_| {}).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (x, _) = toy();
        let mut m = SoftmaxRegression::new(3, 3);
        assert!(m.fit(&x, &[0, 1], |_| {}).is_err());
        assert!(m.fit(&x, &[0, 1, 2, 3, 0, 1], |_| {}).is_err());
        assert!(m.fit(&[], &[], |_| {}).is_err());
    }

    #[test]
    fn test_consistency_check() {
        let mut m = SoftmaxRegression::new(2, 2);
        assert!(m.check_consistency().is_ok());
        m.weights.pop();
        assert!(m.check_consistency().is_err());
    }
}
