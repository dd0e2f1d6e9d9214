//! Multi-horizon price forecasting
//!
//! Turns a chronological series of price bars into blended forecasts for
//! four horizons, with graceful degradation when the data cannot support a
//! model prediction.
//!
//! ## Architecture
//!
//! ```text
//! BarSeries → FeatureEngineer → Normalizer → Regressor → HorizonBlender → PredictionResult
//!                                                ↑
//!                                   Trainer (chronological split, metrics)
//! ```
//!
//! [`ForecastService`] owns the fitted model and exposes
//! train / evaluate / predict / reset.

pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod strategy;

#[cfg(test)]
mod config_tests;

pub use config::ForecastConfig;
pub use data::{Bar, BarSeries};
pub use error::{ForecastError, ModelError, Result};
pub use ml::{ForecastService, Metrics, PredictionResult, ResetAck};
