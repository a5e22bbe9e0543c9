//! Random forest regression over lag-feature rows.
//!
//! CART-style regression trees trained on bootstrap samples; the forest
//! prediction is the mean of tree predictions. Each tree draws its bootstrap
//! sample from a seeded RNG so a fixed seed makes runs reproducible.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::info;

use crate::features::FeatureRow;

const MIN_SAMPLES_SPLIT: usize = 2;
const VARIANCE_EPSILON: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum ForestError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,
    #[error("training rows have inconsistent lag widths: expected {expected}, found {found}")]
    InconsistentWidth { expected: usize, found: usize },
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict_one(&self, lags: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if lags[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Ensemble regressor with externally supplied hyperparameters and a fixed
/// random seed. A single batch fit per invocation; refitting replaces the
/// forest.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<TreeNode>,
    n_estimators: usize,
    max_depth: usize,
    seed: u64,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: 8,
            seed: 1,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fits the forest on training rows. Row order does not matter for the
    /// fit itself, but the caller must hand in the chronological train
    /// segment only.
    pub fn fit(&mut self, rows: &[FeatureRow]) -> Result<(), ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }
        let width = rows[0].lags.len();
        for row in rows {
            if row.lags.len() != width {
                return Err(ForestError::InconsistentWidth {
                    expected: width,
                    found: row.lags.len(),
                });
            }
        }

        let targets: Vec<f64> = rows.iter().map(|row| row.target).collect();

        self.trees = (0..self.n_estimators)
            .map(|tree_idx| {
                let indices = bootstrap_sample(rows.len(), self.seed + tree_idx as u64);
                let sample: Vec<&[f64]> = indices.iter().map(|&i| rows[i].lags.as_slice()).collect();
                let sample_targets: Vec<f64> = indices.iter().map(|&i| targets[i]).collect();
                build_tree(&sample, &sample_targets, 0, self.max_depth)
            })
            .collect();

        info!(
            component = "forest",
            event = "forest.fit.finish",
            n_estimators = self.n_estimators,
            max_depth = self.max_depth,
            train_rows = rows.len(),
            lag_width = width
        );

        Ok(())
    }

    /// Produces one prediction per row, in input order.
    pub fn predict(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let sum: f64 = self
                    .trees
                    .iter()
                    .map(|tree| tree.predict_one(&row.lags))
                    .sum();
                sum / self.trees.len() as f64
            })
            .collect()
    }
}

fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
}

fn build_tree(rows: &[&[f64]], targets: &[f64], depth: usize, max_depth: usize) -> TreeNode {
    if targets.len() < MIN_SAMPLES_SPLIT
        || depth >= max_depth
        || variance(targets) < VARIANCE_EPSILON
    {
        return TreeNode::Leaf {
            value: mean(targets),
        };
    }

    let Some((feature_idx, threshold)) = find_best_split(rows, targets) else {
        return TreeNode::Leaf {
            value: mean(targets),
        };
    };

    let mut left_rows = Vec::new();
    let mut left_targets = Vec::new();
    let mut right_rows = Vec::new();
    let mut right_targets = Vec::new();
    for (row, target) in rows.iter().zip(targets) {
        if row[feature_idx] <= threshold {
            left_rows.push(*row);
            left_targets.push(*target);
        } else {
            right_rows.push(*row);
            right_targets.push(*target);
        }
    }

    TreeNode::Split {
        feature_idx,
        threshold,
        left: Box::new(build_tree(&left_rows, &left_targets, depth + 1, max_depth)),
        right: Box::new(build_tree(
            &right_rows,
            &right_targets,
            depth + 1,
            max_depth,
        )),
    }
}

/// Best split by variance reduction across all features, evaluating
/// midpoints between consecutive sorted unique feature values.
fn find_best_split(rows: &[&[f64]], targets: &[f64]) -> Option<(usize, f64)> {
    let n_features = rows.first()?.len();
    let parent_variance = variance(targets);

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = 0.0;

    for feature_idx in 0..n_features {
        let mut values: Vec<f64> = rows.iter().map(|row| row[feature_idx]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let mut left = Vec::new();
            let mut right = Vec::new();
            for (row, target) in rows.iter().zip(targets) {
                if row[feature_idx] <= threshold {
                    left.push(*target);
                } else {
                    right.push(*target);
                }
            }
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let n = targets.len() as f64;
            let weighted = (left.len() as f64 / n) * variance(&left)
                + (right.len() as f64 / n) * variance(&right);
            let gain = parent_variance - weighted;
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature_idx, threshold));
            }
        }
    }

    best
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}
