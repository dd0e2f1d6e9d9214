//! Trained model bundle

use super::features::FeatureSchema;
use super::metrics::{FeatureImportance, Metrics};
use super::normalizer::Normalizer;
use super::regressor::Regressor;
use crate::config::TargetMode;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Everything a forecast needs from a training run. Built once by the
/// trainer and replaced as a whole, never updated in place.
pub struct FittedModel {
    pub(crate) id: Uuid,
    pub(crate) regressor: Box<dyn Regressor>,
    pub(crate) normalizer: Normalizer,
    pub(crate) schema: FeatureSchema,
    pub(crate) target_mode: TargetMode,
    pub(crate) training_metrics: Metrics,
    pub(crate) trained_at: DateTime<Utc>,
}

impl FittedModel {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn target_mode(&self) -> TargetMode {
        self.target_mode
    }

    /// Metrics from the held-out partition at training time
    pub fn training_metrics(&self) -> &Metrics {
        &self.training_metrics
    }

    pub fn feature_importance(&self) -> &FeatureImportance {
        &self.training_metrics.feature_importance
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

impl std::fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedModel")
            .field("id", &self.id)
            .field("regressor", &self.regressor.name())
            .field("features", &self.schema.len())
            .field("target_mode", &self.target_mode)
            .field("trained_at", &self.trained_at)
            .finish()
    }
}
