//! Stratified train/test split.
//!
//! Rows are grouped by label, each group is shuffled with a seeded `StdRng`
//! and `round(len * test_fraction)` rows of every group go to the test set.
//! Groups are visited in ascending label order, so a given seed and label
//! vector always produce the same partition.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
}

/// Row indices of each partition, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn stratified_split(labels: &[i32], test_fraction: f64, seed: u64) -> Result<Split, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }

    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for indices in groups.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f64 * test_fraction).round() as usize;
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<i32> {
        (0..n).map(|i| i32::from(i % 3 == 0)).collect()
    }

    #[test]
    fn same_seed_same_split() {
        let l = labels(100);
        assert_eq!(
            stratified_split(&l, 0.2, 42).unwrap(),
            stratified_split(&l, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn different_seed_different_membership() {
        let l = labels(100);
        let a = stratified_split(&l, 0.2, 42).unwrap();
        let b = stratified_split(&l, 0.2, 7).unwrap();
        assert_ne!(a.test, b.test);
        assert_eq!(a.test.len(), b.test.len());
    }

    #[test]
    fn partitions_cover_all_rows_once() {
        let l = labels(57);
        let s = stratified_split(&l, 0.3, 1).unwrap();
        let mut all: Vec<usize> = s.train.iter().chain(&s.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..57).collect::<Vec<_>>());
    }

    #[test]
    fn class_proportions_preserved() {
        let l = labels(100); // 34 ones, 66 zeros
        let s = stratified_split(&l, 0.2, 3).unwrap();
        let ones = s.test.iter().filter(|&&i| l[i] == 1).count();
        assert_eq!(ones, 7);
        assert_eq!(s.test.len() - ones, 13);
    }

    #[test]
    fn fraction_bounds() {
        for f in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(stratified_split(&[0, 1], f, 0).is_err());
        }
    }
}
