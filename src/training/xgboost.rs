//! XGBoost-style multiclass gradient boosting with second-order approximation
//!
//! - Softmax objective: one regression tree per class per boosting round
//! - Gradient `p_k - 1[y = k]`, hessian `2 p_k (1 - p_k)`
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Minimum child weight constraint

use crate::error::{Result, SeverityError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Best split candidate for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Build an XGBoost tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let n = indices.len();

    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();

    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || n < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf {
            weight: leaf_weight,
        };
    }

    // Equal gains resolve to the lowest feature index
    let best_split = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, config))
        .max_by(|a, b| {
            a.gain
                .total_cmp(&b.gain)
                .then_with(|| b.feature.cmp(&a.feature))
        });

    match best_split {
        Some(split) if split.gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf {
                    weight: leaf_weight,
                };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right =
                build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf {
            weight: leaf_weight,
        },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    if alpha > 0.0 {
        // Soft-threshold for L1
        let g_adj = if g_sum > alpha {
            g_sum - alpha
        } else if g_sum < -alpha {
            g_sum + alpha
        } else {
            return 0.0;
        };
        -g_adj / (h_sum + lambda)
    } else {
        -g_sum / (h_sum + lambda)
    }
}

/// Find best split for a single feature using exact greedy method
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    let mut sorted_indices: Vec<usize> = indices.to_vec();
    sorted_indices.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(Ordering::Equal)
    });

    let g_total: f64 = sorted_indices.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted_indices.iter().map(|&i| hess[i]).sum();

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    let lambda = config.reg_lambda;

    // The last position would leave the right child empty
    for pos in 0..sorted_indices.len().saturating_sub(1) {
        let idx = sorted_indices[pos];
        let next_idx = sorted_indices[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        // Identical values cannot be separated
        if (x[[idx, feature]] - x[[next_idx, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;

        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - (g_total * g_total) / (h_total + lambda));

        if best.map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (x[[idx, feature]] + x[[next_idx, feature]]) / 2.0,
                gain,
            });
        }
    }

    best
}

// ─── XGBoost Classifier ────────────────────────────────────────────────────

/// Multiclass XGBoost classifier (softmax loss with second-order approximation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    n_classes: usize,
    /// One tree per class for every boosting round
    trees: Vec<Vec<XGBNode>>,
    base_scores: Vec<f64>,
    n_features: usize,
    is_fitted: bool,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig, n_classes: usize) -> Self {
        Self {
            config,
            n_classes,
            trees: Vec::new(),
            base_scores: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of boosting rounds fitted
    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Row-wise softmax in place
    fn softmax_rows(raw: &Array2<f64>) -> Array2<f64> {
        let mut probs = raw.clone();
        for mut row in probs.rows_mut() {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        probs
    }

    fn validate_training_data(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        if self.n_classes < 2 {
            return Err(SeverityError::TrainingError(format!(
                "classifier needs at least 2 classes, configured with {}",
                self.n_classes
            )));
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(SeverityError::TrainingError(
                "training set is empty".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(SeverityError::TrainingError(format!(
                "feature rows ({}) and labels ({}) differ in length",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
            return Err(SeverityError::TrainingError(format!(
                "non-finite feature value at row {}, column {}",
                pos / x.ncols(),
                pos % x.ncols()
            )));
        }
        if let Some((row, &label)) = y
            .iter()
            .enumerate()
            .find(|(_, &l)| l < 0 || l as usize >= self.n_classes)
        {
            return Err(SeverityError::TrainingError(format!(
                "label {} at row {} is outside 0..{}",
                label, row, self.n_classes
            )));
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.validate_training_data(x, y)?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let k = self.n_classes;
        self.n_features = n_features;

        // Base score: log of the class prior
        let mut counts = vec![0usize; k];
        for &label in y.iter() {
            counts[label as usize] += 1;
        }
        self.base_scores = counts
            .iter()
            .map(|&c| (c as f64 / n_samples as f64).clamp(1e-7, 1.0).ln())
            .collect();

        let mut raw = Array2::from_shape_fn((n_samples, k), |(_, c)| self.base_scores[c]);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for round in 0..self.config.n_estimators {
            let probs = Self::softmax_rows(&raw);

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let mut round_trees = Vec::with_capacity(k);
            for class in 0..k {
                let p = probs.column(class);
                let grad: Vec<f64> = p
                    .iter()
                    .zip(y.iter())
                    .map(|(&p, &label)| p - if label as usize == class { 1.0 } else { 0.0 })
                    .collect();
                let hess: Vec<f64> = p.iter().map(|&p| (2.0 * p * (1.0 - p)).max(1e-6)).collect();

                let tree =
                    build_xgb_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

                // Every row moves, not just the sampled ones
                for (i, row) in x.axis_iter(Axis(0)).enumerate() {
                    raw[[i, class]] += self.config.learning_rate * tree.predict(row);
                }

                round_trees.push(tree);
            }

            self.trees.push(round_trees);
            if (round + 1) % 25 == 0 {
                debug!(round = round + 1, "Boosting progress");
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(SeverityError::StateError(
                "classifier must be fitted before predicting".to_string(),
            ));
        }
        if x.ncols() != self.n_features {
            return Err(SeverityError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Raw margin per class
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let mut raw = Array2::from_shape_fn((x.nrows(), self.n_classes), |(_, c)| {
            self.base_scores[c]
        });
        for (i, sample) in x.axis_iter(Axis(0)).enumerate() {
            for round in &self.trees {
                for (class, tree) in round.iter().enumerate() {
                    raw[[i, class]] += self.config.learning_rate * tree.predict(sample);
                }
            }
        }
        Ok(raw)
    }

    /// Class probabilities, one row per sample summing to one
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(Self::softmax_rows(&self.decision_function(x)?))
    }

    /// Most probable class per sample; ties go to the lower class code
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0usize;
                for (c, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = c;
                    }
                }
                best as i64
            })
            .collect())
    }

    /// Compute feature importances by counting splits across all trees
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in self.trees.iter().flatten() {
            xgb_count_splits(tree, &mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }
}

fn xgb_count_splits(node: &XGBNode, counts: &mut [f64]) {
    match node {
        XGBNode::Leaf { .. } => {}
        XGBNode::Split {
            feature,
            left,
            right,
            ..
        } => {
            if *feature < counts.len() {
                counts[*feature] += 1.0;
            }
            xgb_count_splits(left, counts);
            xgb_count_splits(right, counts);
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
