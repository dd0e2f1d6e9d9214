//! Regression backends
//!
//! Both backends consume scaled feature rows in chronological order and emit
//! one output per row. Only `fit`/`predict` differ; the rest of the pipeline
//! is shared.

mod forest;
mod sequence;

pub use forest::RandomForest;
pub use sequence::SequenceRegressor;

use crate::config::{Backend, ForecastConfig};
use crate::error::ModelError;

/// Trainable regression model
#[cfg_attr(test, mockall::automock)]
pub trait Regressor: Send + Sync {
    /// Fit on rows (chronological) and their targets
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError>;

    /// One output per input row. Rows earlier in `features` may be used as
    /// history for later ones.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Per-feature importance, summing to 1 (or all zero)
    fn feature_importances(&self) -> Vec<f64>;

    /// Number of trailing rows needed to predict the most recent one
    fn context_len(&self) -> usize {
        1
    }

    /// Model name for logging
    fn name(&self) -> &'static str;
}

/// Fresh, unfitted regressor for the configured backend
pub fn build_regressor(config: &ForecastConfig) -> Box<dyn Regressor> {
    match config.model.backend {
        Backend::Forest => Box::new(RandomForest::new(config.forest.clone())),
        Backend::Sequence => Box::new(SequenceRegressor::new(config.sequence.clone())),
    }
}

/// Check every row has `width` columns
pub(crate) fn check_width(features: &[Vec<f64>], width: usize) -> Result<(), ModelError> {
    match features.iter().find(|r| r.len() != width) {
        Some(row) => Err(ModelError::InvalidShape {
            expected: width,
            got: row.len(),
        }),
        None => Ok(()),
    }
}

/// Scale to unit sum; all-zero input stays zero
pub(crate) fn normalize_importances(mut weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter_mut().for_each(|w| *w /= total);
    } else {
        weights.iter_mut().for_each(|w| *w = 0.0);
    }
    weights
}
