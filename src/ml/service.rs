//! Forecast service
//!
//! Owns the fitted model for one forecasting context. `train` and `reset`
//! replace the state under the write lock; `predict` and `evaluate` share the
//! read lock and may run concurrently with each other.

use super::blender::{HorizonBlender, PredictionResult};
use super::features::FeatureSchema;
use super::fitted::FittedModel;
use super::metrics::Metrics;
use super::regressor::{build_regressor, Regressor};
use super::trainer::Trainer;
use crate::config::ForecastConfig;
use crate::data::BarSeries;
use crate::error::{ForecastError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Service lifecycle
#[derive(Debug, Default)]
pub enum ModelState {
    #[default]
    Untrained,
    Trained(FittedModel),
}

/// Returned by [`ForecastService::reset`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetAck {
    pub status: String,
    pub message: String,
}

pub struct ForecastService {
    config: ForecastConfig,
    state: RwLock<ModelState>,
}

impl ForecastService {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ModelState::Untrained),
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Fit a fresh regressor for the configured backend
    pub fn train(&self, series: &BarSeries) -> Result<Metrics> {
        self.train_with(series, build_regressor(&self.config))
    }

    /// Fit the given (unfitted) regressor. On failure the previous state is kept.
    pub fn train_with(&self, series: &BarSeries, regressor: Box<dyn Regressor>) -> Result<Metrics> {
        let mut state = self.state.write();
        let fitted = self.trainer().fit(series, regressor)?;
        let metrics = fitted.training_metrics().clone();
        info!("Model {} trained on {} bars", fitted.id(), series.len());
        *state = ModelState::Trained(fitted);
        Ok(metrics)
    }

    pub fn evaluate(&self, series: &BarSeries) -> Result<Metrics> {
        match &*self.state.read() {
            ModelState::Trained(fitted) => self.trainer().evaluate(series, fitted),
            ModelState::Untrained => Err(ForecastError::NotTrained),
        }
    }

    /// Forecast every horizon. Only fails when no model is trained; any
    /// other failure yields a degraded result.
    pub fn predict(&self, series: &BarSeries) -> Result<PredictionResult> {
        match &*self.state.read() {
            ModelState::Trained(fitted) => Ok(HorizonBlender::predict(series, fitted)),
            ModelState::Untrained => Err(ForecastError::NotTrained),
        }
    }

    /// Drop the fitted model
    pub fn reset(&self) -> ResetAck {
        *self.state.write() = ModelState::Untrained;
        info!("Forecast model reset");
        ResetAck {
            status: "success".to_string(),
            message: "Model reset successfully".to_string(),
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(*self.state.read(), ModelState::Trained(_))
    }

    /// Schema frozen by the current model
    pub fn schema(&self) -> Option<FeatureSchema> {
        match &*self.state.read() {
            ModelState::Trained(fitted) => Some(fitted.schema().clone()),
            ModelState::Untrained => None,
        }
    }

    pub fn model_id(&self) -> Option<Uuid> {
        match &*self.state.read() {
            ModelState::Trained(fitted) => Some(fitted.id()),
            ModelState::Untrained => None,
        }
    }

    fn trainer(&self) -> Trainer {
        Trainer::new(self.config.training.clone(), self.config.model.target_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForecastService>();
    }

    #[test]
    fn test_initial_state() {
        let service = ForecastService::new(ForecastConfig::default());
        assert!(!service.is_trained());
        assert!(service.schema().is_none());
        assert!(service.model_id().is_none());

        let ack = service.reset();
        assert_eq!(ack.status, "success");
        assert!(!service.is_trained());
    }
}
