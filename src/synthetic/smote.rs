//! SMOTE oversampling

use crate::error::{Result, SeverityError};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Accepted range of [`SMOTE::with_sampling_strategy`]
pub const SAMPLING_STRATEGY_RANGE: (f64, f64) = (0.1, 10.0);

/// SMOTE (Synthetic Minority Over-sampling Technique)
///
/// Every class is brought up to `floor(majority * sampling_strategy)` rows by
/// interpolating a random class member toward one of its `k_neighbors`
/// nearest same-class neighbours. A class with a single member has no
/// neighbour, so that member is duplicated instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Target count of every class as a fraction of the majority count
    sampling_strategy: f64,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            sampling_strategy: 1.0,
            seed: None,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set sampling strategy (ratio), clamped to [`SAMPLING_STRATEGY_RANGE`]
    pub fn with_sampling_strategy(mut self, ratio: f64) -> Self {
        let (min, max) = SAMPLING_STRATEGY_RANGE;
        self.sampling_strategy = ratio.clamp(min, max);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    pub fn sampling_strategy(&self) -> f64 {
        self.sampling_strategy
    }

    /// Per-class targets computed by the last fit
    pub fn target_counts(&self) -> Option<&BTreeMap<i64, usize>> {
        self.target_counts.as_ref()
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// k nearest members of `members` for each member, by position, self excluded.
    /// Equal distances are ordered by position.
    fn neighbor_table(x: &Array2<f64>, members: &[usize], k: usize) -> Vec<Vec<usize>> {
        members
            .iter()
            .enumerate()
            .map(|(pos, &row)| {
                let mut dists: Vec<(f64, usize)> = members
                    .iter()
                    .enumerate()
                    .filter(|&(other_pos, _)| other_pos != pos)
                    .map(|(other_pos, &other)| {
                        (Self::squared_distance(x.row(row), x.row(other)), other_pos)
                    })
                    .collect();
                dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                dists.into_iter().take(k).map(|(_, p)| p).collect()
            })
            .collect()
    }

    /// Generate synthetic sample between two points
    fn generate_sample(
        point: ArrayView1<f64>,
        neighbor: ArrayView1<f64>,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }

    fn validate(x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SeverityError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        if y.is_empty() {
            return Err(SeverityError::TrainingError(
                "cannot resample an empty training set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        Self::validate(x, y)?;
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(SeverityError::TrainingError(format!(
                "need at least 2 classes for SMOTE, found {}",
                counts.len()
            )));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let target = (max_count as f64 * self.sampling_strategy).floor() as usize;

        let targets: BTreeMap<i64, usize> = counts
            .iter()
            .map(|(&class, &count)| (class, target.max(count)))
            .collect();

        debug!(?counts, ?targets, "Fitted SMOTE targets");
        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        Self::validate(x, y)?;
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| SeverityError::StateError("SMOTE not fitted".to_string()))?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let indices = class_indices(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let members = match indices.get(&class) {
                Some(members) => members,
                None => {
                    return Err(SeverityError::StateError(format!(
                        "class {} was fitted but is absent from the data",
                        class
                    )))
                }
            };
            let n_to_generate = target_count.saturating_sub(members.len());
            n_synthetic.insert(class, n_to_generate);

            if n_to_generate == 0 {
                continue;
            }

            if members.len() == 1 {
                let row = x.row(members[0]);
                for _ in 0..n_to_generate {
                    synthetic_x.extend(row.iter().copied());
                    synthetic_y.push(class);
                }
                continue;
            }

            let k = self.k_neighbors.min(members.len() - 1);
            let neighbors = Self::neighbor_table(x, members, k);

            for _ in 0..n_to_generate {
                let pos = rng.gen_range(0..members.len());
                let neighbor_pos = neighbors[pos][rng.gen_range(0..neighbors[pos].len())];

                let sample =
                    Self::generate_sample(x.row(members[pos]), x.row(members[neighbor_pos]), &mut rng);
                synthetic_x.extend(sample);
                synthetic_y.push(class);
            }
        }

        let n_original = x.nrows();
        let n_new = synthetic_y.len();
        let synthetic = Array2::from_shape_vec((n_new, n_features), synthetic_x)?;

        let result_x = Array2::from_shape_fn((n_original + n_new, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic[[i - n_original, j]]
            }
        });

        let mut all_y: Vec<i64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        info!(
            original = n_original,
            synthetic = n_new,
            "Resampled training split"
        );

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}
