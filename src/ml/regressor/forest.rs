//! Random forest regressor
//!
//! Bootstrap-aggregated CART trees with a squared-error split criterion.
//! Trees are grown in parallel; tree `t` draws its bootstrap sample from an
//! RNG seeded with `seed + t`, so a fixed seed gives identical forests.

use super::{check_width, normalize_importances, Regressor};
use crate::config::ForestConfig;
use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Rows sent left once samples are sorted by `feature`
    left_count: usize,
    gain: f64,
}

/// Single regression tree stored as a flat node arena
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
    /// Unnormalized impurity decrease per feature
    importances: Vec<f64>,
}

impl RegressionTree {
    fn fit(features: &[Vec<f64>], targets: &[f64], mut samples: Vec<usize>, config: &ForestConfig) -> Self {
        let width = features.first().map(Vec::len).unwrap_or(0);
        let mut tree = Self {
            nodes: Vec::new(),
            importances: vec![0.0; width],
        };
        tree.grow(features, targets, &mut samples, 0, config);
        tree
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        samples: &mut [usize],
        depth: usize,
        config: &ForestConfig,
    ) -> usize {
        let n = samples.len();
        let (sum, sum_sq) = samples
            .iter()
            .fold((0.0, 0.0), |(s, q), &i| (s + targets[i], q + targets[i] * targets[i]));
        let mean = sum / n as f64;
        let sse = sum_sq - sum * sum / n as f64;

        let can_split = depth < config.max_depth
            && n >= config.min_samples_split.max(2)
            && n >= 2 * config.min_samples_leaf.max(1)
            && sse > MIN_GAIN;

        let candidate = if can_split {
            best_split(features, targets, samples, sum, config.min_samples_leaf.max(1))
        } else {
            None
        };

        let Some(split) = candidate else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.importances[split.feature] += split.gain;

        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        samples.sort_by(|&a, &b| features[a][split.feature].total_cmp(&features[b][split.feature]));
        let (left_samples, right_samples) = samples.split_at_mut(split.left_count);

        let left = self.grow(features, targets, left_samples, depth + 1, config);
        let right = self.grow(features, targets, right_samples, depth + 1, config);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Best squared-error split over all features, if any improves on the parent
fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    samples: &[usize],
    total: f64,
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let width = features[samples[0]].len();
    let parent_score = total * total / n as f64;
    let mut best: Option<SplitCandidate> = None;
    let mut order: Vec<usize> = samples.to_vec();

    for feature in 0..width {
        order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        for i in 1..n {
            left_sum += targets[order[i - 1]];

            let lo = features[order[i - 1]][feature];
            let hi = features[order[i]][feature];
            if lo >= hi || i < min_leaf || n - i < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / i as f64 + right_sum * right_sum / (n - i) as f64;
            let gain = score - parent_score;

            if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                let mid = lo + (hi - lo) / 2.0;
                best = Some(SplitCandidate {
                    feature,
                    threshold: if mid < hi { mid } else { lo },
                    left_count: i,
                    gain,
                });
            }
        }
    }

    best
}

/// Bagged ensemble of regression trees
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    width: usize,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            width: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if features.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        let width = features[0].len();
        check_width(features, width)?;

        let n = features.len();
        let config = &self.config;
        let trees: Vec<RegressionTree> = (0..config.n_estimators.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let samples: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(features, targets, samples, config)
            })
            .collect();

        debug!(
            "Fitted {} trees on {} rows x {} features",
            trees.len(),
            n,
            width
        );
        self.trees = trees;
        self.width = width;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(features, self.width)?;

        let n_trees = self.trees.len() as f64;
        Ok(features
            .iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn feature_importances(&self) -> Vec<f64> {
        if self.trees.is_empty() {
            return Vec::new();
        }
        let mut total = vec![0.0; self.width];
        for tree in &self.trees {
            for (acc, w) in total.iter_mut().zip(normalize_importances(tree.importances.clone())) {
                *acc += w;
            }
        }
        normalize_importances(total)
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
