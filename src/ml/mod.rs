//! Forecasting pipeline
//!
//! Provides multi-horizon price forecasting with:
//! - Technical feature engineering from bar series
//! - Min-max scaling with a frozen feature schema
//! - Random forest and windowed ridge regression backends
//! - Chronological train/test evaluation
//! - Horizon blending with cadence-aware labels and last-price fallback

pub mod blender;
pub mod features;
pub mod fitted;
pub mod metrics;
pub mod normalizer;
pub mod regressor;
pub mod service;
pub mod trainer;


pub use blender::{Blend, BlendContext, Cadence, ForecastSource, HorizonBlender, PredictionResult};
pub use features::{FeatureEngineer, FeatureFrame, FeatureRow, FeatureSchema};
pub use fitted::FittedModel;
pub use metrics::{FeatureImportance, Metrics};
pub use normalizer::{Normalizer, TransformMismatch};
pub use regressor::{build_regressor, RandomForest, Regressor, SequenceRegressor};
pub use service::{ForecastService, ModelState, ResetAck};
pub use trainer::Trainer;
