//! Train/test row partitioning

use crate::error::{Result, SeverityError};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encoded rows partitioned into train and test subsets
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
}

/// Shuffling train/test splitter.
///
/// The test set holds `ceil(n * test_size)` rows. With stratification enabled
/// the test rows are allocated per class by largest remainder, and every class
/// keeps at least one training row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainTestSplitter {
    test_size: f64,
    stratify: bool,
    random_state: Option<u64>,
}

impl TrainTestSplitter {
    pub fn new(test_size: f64) -> Self {
        Self {
            test_size,
            stratify: true,
            random_state: None,
        }
    }

    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Row indices for the train and test subsets
    pub fn split_indices(&self, y: &Array1<i64>) -> Result<(Vec<usize>, Vec<usize>)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SeverityError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }

        let n = y.len();
        if n < 2 {
            return Err(SeverityError::DataError(format!(
                "need at least 2 rows to split, got {}",
                n
            )));
        }

        let n_test = ((n as f64 * self.test_size).ceil() as usize).clamp(1, n - 1);

        let mut rng = match self.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        if !self.stratify {
            let mut permutation: Vec<usize> = (0..n).collect();
            permutation.shuffle(&mut rng);
            let train = permutation.split_off(n_test);
            return Ok((train, permutation));
        }

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        let sizes: Vec<usize> = by_class.values().map(|v| v.len()).collect();
        let allocation = allocate_test_counts(&sizes, n_test, n);

        let mut train = Vec::with_capacity(n - n_test);
        let mut test = Vec::with_capacity(n_test);
        for (indices, &n_class_test) in by_class.values_mut().zip(allocation.iter()) {
            indices.shuffle(&mut rng);
            test.extend_from_slice(&indices[..n_class_test]);
            train.extend_from_slice(&indices[n_class_test..]);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok((train, test))
    }

    /// Partition the rows of `x` and `y`
    pub fn split(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<TrainTestSplit> {
        if x.nrows() != y.len() {
            return Err(SeverityError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let (train, test) = self.split_indices(y)?;

        Ok(TrainTestSplit {
            x_train: x.select(Axis(0), &train),
            x_test: x.select(Axis(0), &test),
            y_train: y.select(Axis(0), &train),
            y_test: y.select(Axis(0), &test),
        })
    }
}

impl Default for TrainTestSplitter {
    fn default() -> Self {
        Self::new(0.25)
    }
}

/// Largest-remainder allocation of `n_test` rows across classes
fn allocate_test_counts(class_sizes: &[usize], n_test: usize, n: usize) -> Vec<usize> {
    let exact: Vec<f64> = class_sizes
        .iter()
        .map(|&size| size as f64 * n_test as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    let mut order: Vec<usize> = (0..class_sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(&b))
    });
    for &class in &order {
        if remaining == 0 {
            break;
        }
        if counts[class] < class_sizes[class] {
            counts[class] += 1;
            remaining -= 1;
        }
    }

    for (count, &size) in counts.iter_mut().zip(class_sizes) {
        if size > 0 && *count >= size {
            *count = size - 1;
        }
    }

    counts
}
