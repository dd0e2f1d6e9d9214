//! Sequence regressor
//!
//! Linear autoregression over a sliding window of the last `lookback`
//! feature rows, fitted in closed form with an L2 penalty. Rows without a
//! full history are padded with the earliest row available.

use super::{check_width, normalize_importances, Regressor};
use crate::config::SequenceConfig;
use crate::error::ModelError;
use tracing::debug;

pub struct SequenceRegressor {
    config: SequenceConfig,
    /// Window coefficients (oldest row first) followed by the intercept
    weights: Vec<f64>,
    width: usize,
}

impl SequenceRegressor {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            width: 0,
        }
    }

    fn lookback(&self) -> usize {
        self.config.lookback.max(1)
    }

    /// Flattened window ending at row `i`, plus a trailing 1.0 for the intercept
    fn window(&self, features: &[Vec<f64>], i: usize) -> Vec<f64> {
        let lookback = self.lookback();
        let mut input = Vec::with_capacity(lookback * self.width + 1);
        for lag in (0..lookback).rev() {
            input.extend_from_slice(&features[i.saturating_sub(lag)]);
        }
        input.push(1.0);
        input
    }
}

impl Regressor for SequenceRegressor {
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
        self.width = features[0].len();
        check_width(features, self.width)?;

        let inputs: Vec<Vec<f64>> = (0..features.len()).map(|i| self.window(features, i)).collect();
        let dim = inputs[0].len();

        // Normal equations: (X'X + lambda * I) w = X'y, intercept unpenalized
        let mut gram = vec![vec![0.0; dim]; dim];
        let mut rhs = vec![0.0; dim];
        for (x, &y) in inputs.iter().zip(targets) {
            for r in 0..dim {
                rhs[r] += x[r] * y;
                for c in r..dim {
                    gram[r][c] += x[r] * x[c];
                }
            }
        }
        for r in 0..dim {
            for c in 0..r {
                gram[r][c] = gram[c][r];
            }
            if r + 1 < dim {
                gram[r][r] += self.config.ridge_lambda;
            }
        }

        self.weights = solve(gram, rhs)?;
        debug!(
            "Fitted sequence model: {} rows, window {} x {}",
            features.len(),
            self.lookback(),
            self.width
        );
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(features, self.width)?;

        Ok((0..features.len())
            .map(|i| {
                self.window(features, i)
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, w)| x * w)
                    .sum()
            })
            .collect())
    }

    fn feature_importances(&self) -> Vec<f64> {
        if self.weights.is_empty() {
            return Vec::new();
        }
        let mut totals = vec![0.0; self.width];
        for lag in 0..self.lookback() {
            for (j, total) in totals.iter_mut().enumerate() {
                *total += self.weights[lag * self.width + j].abs();
            }
        }
        normalize_importances(totals)
    }

    fn context_len(&self) -> usize {
        self.lookback()
    }

    fn name(&self) -> &'static str {
        "sequence_ridge"
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(ModelError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
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
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);

        assert_eq!(solve(vec![vec![0.0]], vec![1.0]), Err(ModelError::Singular));
    }

    #[test]
    fn test_recovers_linear_relation() {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i as f64 * 0.3).sin(), (i as f64 * 0.7).cos()])
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| 2.0 * r[0] - r[1] + 0.5).collect();

        let mut model = SequenceRegressor::new(SequenceConfig {
            lookback: 1,
            ridge_lambda: 1e-9,
        });
        model.fit(&features, &targets).unwrap();

        let preds = model.predict(&features).unwrap();
        for (p, t) in preds.iter().zip(&targets) {
            assert!((p - t).abs() < 1e-6);
        }
        let importances = model.feature_importances();
        assert!((importances[0] - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_uses_history() {
        // target is the previous row's feature
        let features: Vec<Vec<f64>> = (0..50).map(|i| vec![((i * 7) % 11) as f64]).collect();
        let targets: Vec<f64> = (0..50usize).map(|i| features[i.saturating_sub(1)][0]).collect();

        let mut model = SequenceRegressor::new(SequenceConfig {
            lookback: 2,
            ridge_lambda: 1e-9,
        });
        model.fit(&features, &targets).unwrap();
        assert_eq!(model.context_len(), 2);

        let preds = model.predict(&features[10..13]).unwrap();
        assert!((preds[2] - features[11][0]).abs() < 1e-6);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = SequenceRegressor::new(SequenceConfig::default());
        assert_eq!(model.predict(&[vec![1.0]]), Err(ModelError::NotFitted));
    }
}
