//! Chronological training and evaluation

use super::features::{FeatureEngineer, FeatureRow};
use super::fitted::FittedModel;
use super::metrics::{r2_score, FeatureImportance, Metrics};
use super::normalizer::{sanitize, scale_or_refit, Normalizer};
use super::regressor::Regressor;
use crate::config::{TargetMode, TrainingConfig};
use crate::data::BarSeries;
use crate::error::{ForecastError, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Regression target for a row whose next price is `next`
pub(crate) fn encode_target(mode: TargetMode, price: f64, next: f64) -> f64 {
    match mode {
        TargetMode::Relative => next / price - 1.0,
        TargetMode::Absolute => next,
    }
}

/// Map a regressor output back to a price
pub(crate) fn decode_prediction(mode: TargetMode, price: f64, output: f64) -> f64 {
    match mode {
        TargetMode::Relative => price * (1.0 + output),
        TargetMode::Absolute => output,
    }
}

pub struct Trainer {
    config: TrainingConfig,
    target_mode: TargetMode,
}

impl Trainer {
    pub fn new(config: TrainingConfig, target_mode: TargetMode) -> Self {
        Self { config, target_mode }
    }

    /// Fit `regressor` on the first `train_fraction` of the labelled rows and
    /// score it on the rest
    pub fn fit(&self, series: &BarSeries, mut regressor: Box<dyn Regressor>) -> Result<FittedModel> {
        let frame = FeatureEngineer::engineer(series)?;
        let mode = self.target_mode;

        let rows: Vec<&FeatureRow> = frame
            .labelled()
            .into_iter()
            .filter(|r| r.next_price().is_some_and(|next| encode_target(mode, r.price, next).is_finite()))
            .collect();

        let n = rows.len();
        let needed = self.config.min_train_rows.max(2);
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }

        let features: Vec<Vec<f64>> = rows.iter().map(|r| r.values.clone()).collect();
        let actual: Vec<f64> = rows.iter().filter_map(|r| r.next_price()).collect();
        let targets: Vec<f64> = rows
            .iter()
            .zip(&actual)
            .map(|(r, &next)| encode_target(mode, r.price, next))
            .collect();

        let (normalizer, scaled) = Normalizer::fit_transform(&features);
        let split = ((n as f64 * self.config.train_fraction) as usize).clamp(1, n - 1);

        info!(
            "Training {} on {} rows ({} train / {} test, {} features)",
            regressor.name(),
            n,
            split,
            n - split,
            frame.schema().len()
        );

        regressor.fit(&scaled[..split], &targets[..split])?;

        let outputs = regressor.predict(&scaled)?;
        let predicted: Vec<f64> = rows
            .iter()
            .zip(&outputs)
            .map(|(r, &out)| decode_prediction(mode, r.price, out))
            .collect();

        let mut metrics = Metrics::compute(&actual[split..], &predicted[split..]);
        metrics.train_score = Some(r2_score(&actual[..split], &predicted[..split]));
        metrics.feature_importance =
            FeatureImportance::ranked(frame.schema().names(), &regressor.feature_importances());

        info!(
            "Training complete: train R² {:.4}, test R² {:.4}, RMSE {:.4}",
            metrics.train_score.unwrap_or(f64::NAN),
            metrics.test_score.unwrap_or(f64::NAN),
            metrics.rmse.unwrap_or(f64::NAN)
        );

        Ok(FittedModel {
            id: Uuid::new_v4(),
            regressor,
            normalizer,
            schema: frame.schema().clone(),
            target_mode: mode,
            training_metrics: metrics,
            trained_at: Utc::now(),
        })
    }

    /// Score a fitted model on a new series against its 1-step targets
    pub fn evaluate(&self, series: &BarSeries, model: &FittedModel) -> Result<Metrics> {
        let frame = FeatureEngineer::engineer(series)?;
        let rows = frame.labelled();

        if rows.len() < self.config.min_eval_rows {
            warn!(
                "Only {} usable rows for evaluation (need {}), returning empty metrics",
                rows.len(),
                self.config.min_eval_rows
            );
            return Ok(Metrics::empty());
        }

        let mut features = frame.project(&rows, model.schema())?;
        let replaced = sanitize(&mut features);
        if replaced > 0 {
            warn!("Replaced {} non-finite feature values with 0", replaced);
        }
        let scaled = scale_or_refit(model.normalizer(), &features);

        let outputs = model.regressor().predict(&scaled)?;
        let actual: Vec<f64> = rows.iter().filter_map(|r| r.next_price()).collect();
        let predicted: Vec<f64> = rows
            .iter()
            .zip(&outputs)
            .map(|(r, &out)| decode_prediction(model.target_mode(), r.price, out))
            .collect();

        let mut metrics = Metrics::compute(&actual, &predicted);
        metrics.train_score = model.training_metrics().train_score;
        metrics.feature_importance = model.feature_importance().clone();

        debug!(
            "Evaluated on {} rows: R² {:.4}",
            rows.len(),
            metrics.r2.unwrap_or(f64::NAN)
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_round_trip() {
        for mode in [TargetMode::Relative, TargetMode::Absolute] {
            let target = encode_target(mode, 100.0, 102.0);
            assert!((decode_prediction(mode, 100.0, target) - 102.0).abs() < 1e-9);
        }
        assert!((encode_target(TargetMode::Relative, 100.0, 102.0) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_zero_price_relative_target_is_not_finite() {
        assert!(!encode_target(TargetMode::Relative, 0.0, 1.0).is_finite());
    }
}
