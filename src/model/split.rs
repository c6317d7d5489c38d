use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{FaiscError, Result};

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified train/test split over class indices.
///
/// Every class keeps its share of the test set (rounded, at least one test and
/// one train row per class). Classes are visited in ascending order and
/// shuffled with a `StdRng` seeded from `seed`, so the partition is
/// reproducible. Both index lists come back sorted.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(FaiscError::Data(format!(
            "test fraction must be strictly between 0 and 1, got {}",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &class) in labels.iter().enumerate() {
        by_class.entry(class).or_default().push(row);
    }

    if by_class.len() < 2 {
        return Err(FaiscError::Data(format!(
            "need at least 2 distinct labels, found {}",
            by_class.len()
        )));
    }
    if let Some((class, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(FaiscError::Data(format!(
            "class index {} has {} example(s); every class needs at least 2 for a stratified split",
            class,
            rows.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };

    for rows in by_class.values_mut() {
        rows.shuffle(&mut rng);
        let n = rows.len();
        let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
        split.test.extend_from_slice(&rows[..n_test]);
        split.train.extend_from_slice(&rows[n_test..]);
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_stratified_and_complete() {
        let labels: Vec<usize> = (0..50).map(|i| if i < 40 { 0 } else { 1 }).collect();
        let split = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(split.train.len() + split.test.len(), 50);
        let test_class_0 = split.test.iter().filter(|&&i| labels[i] == 0).count();
        let test_class_1 = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_class_0, 8);
        assert_eq!(test_class_1, 2);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let a = stratified_split(&labels, 0.2, 7).unwrap();
        let b = stratified_split(&labels, 0.2, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_classes_keep_one_on_each_side() {
        let labels = [0, 0, 1, 1, 1];
        let split = stratified_split(&labels, 0.2, 1).unwrap();
        for class in [0, 1] {
            assert!(split.test.iter().any(|&i| labels[i] == class));
            assert!(split.train.iter().any(|&i| labels[i] == class));
        }
    }

    #[test]
    fn test_rejects_insufficient_classes() {
        assert!(matches!(
            stratified_split(&[0, 0, 0], 0.2, 1),
            Err(FaiscError::Data(_))
        ));
        assert!(matches!(
            stratified_split(&[0, 0, 1], 0.2, 1),
            Err(FaiscError::Data(_))
        ));
        assert!(stratified_split(&[0, 0, 1, 1], 1.0, 1).is_err());
    }
}
