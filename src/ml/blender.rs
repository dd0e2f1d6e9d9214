//! Multi-horizon forecast blending
//!
//! The model only predicts one step ahead. Longer horizons mix that output
//! with the latest price and moving averages using fixed weights, and the
//! horizon labels follow the sampling cadence of the input.

use super::features::{FeatureEngineer, FeatureRow};
use super::fitted::FittedModel;
use super::normalizer::{sanitize, scale_or_refit};
use super::trainer::decode_prediction;
use crate::data::BarSeries;
use crate::error::{ForecastError, Result};
use chrono::Duration;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, warn};

/// Weights over (model output, price, sma5, sma20, sma50)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub model: f64,
    pub price: f64,
    pub sma5: f64,
    pub sma20: f64,
    pub sma50: f64,
}

impl Blend {
    pub const SHORT: Blend = Blend {
        model: 0.4,
        price: 0.3,
        sma5: 0.2,
        sma20: 0.1,
        sma50: 0.0,
    };
    pub const MEDIUM: Blend = Blend {
        model: 0.2,
        price: 0.1,
        sma5: 0.0,
        sma20: 0.3,
        sma50: 0.4,
    };
    pub const LONG: Blend = Blend {
        model: 0.1,
        price: 0.1,
        sma5: 0.0,
        sma20: 0.2,
        sma50: 0.6,
    };

    pub fn total(&self) -> f64 {
        self.model + self.price + self.sma5 + self.sma20 + self.sma50
    }

    pub fn apply(&self, p1: f64, ctx: &BlendContext) -> f64 {
        self.model * p1
            + self.price * ctx.price
            + self.sma5 * ctx.sma5
            + self.sma20 * ctx.sma20
            + self.sma50 * ctx.sma50
    }
}

/// Latest price and moving averages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendContext {
    pub price: f64,
    pub sma5: f64,
    pub sma20: f64,
    pub sma50: f64,
}

/// Horizon values for a one-step prediction, shortest first
pub fn blend(p1: f64, ctx: &BlendContext) -> [f64; 4] {
    [
        p1,
        Blend::SHORT.apply(p1, ctx),
        Blend::MEDIUM.apply(p1, ctx),
        Blend::LONG.apply(p1, ctx),
    ]
}

/// Sampling interval of the input series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Daily,
}

impl Cadence {
    const HOURLY_MIN: i64 = 30 * 60 * 1000;
    const HOURLY_MAX: i64 = 90 * 60 * 1000;

    pub fn detect(series: &BarSeries) -> Self {
        Self::from_spacing(series.median_spacing())
    }

    /// Hourly when the median spacing is within [30, 90] minutes
    pub fn from_spacing(spacing: Option<Duration>) -> Self {
        match spacing.map(|d| d.num_milliseconds()) {
            Some(ms) if (Self::HOURLY_MIN..=Self::HOURLY_MAX).contains(&ms) => Cadence::Hourly,
            _ => Cadence::Daily,
        }
    }

    pub fn labels(&self) -> [&'static str; 4] {
        match self {
            Cadence::Hourly => ["1h", "4h", "8h", "24h"],
            Cadence::Daily => ["1d", "7d", "30d", "90d"],
        }
    }
}

/// Where a forecast came from
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastSource {
    Model,
    /// Last known price repeated, with the failure that caused it
    Degraded { error: String },
}

/// Four horizon forecasts under cadence-specific labels
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub cadence: Cadence,
    pub forecasts: [f64; 4],
    pub source: ForecastSource,
}

impl PredictionResult {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.cadence.labels().into_iter().zip(self.forecasts)
    }

    /// One-step forecast
    pub fn next(&self) -> f64 {
        self.forecasts[0]
    }

    pub fn error(&self) -> Option<&str> {
        match &self.source {
            ForecastSource::Model => None,
            ForecastSource::Degraded { error } => Some(error.as_str()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ForecastSource::Degraded { .. })
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let error = self.error();
        let mut map = serializer.serialize_map(Some(4 + usize::from(error.is_some())))?;
        for (label, value) in self.iter() {
            let value = Some(value).filter(|v| v.is_finite());
            map.serialize_entry(label, &value)?;
        }
        if let Some(error) = error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

pub struct HorizonBlender;

impl HorizonBlender {
    /// Forecast all horizons from the latest row of `series`. Failures
    /// degrade to the last valid price (or 0.0) for every horizon.
    pub fn predict(series: &BarSeries, model: &FittedModel) -> PredictionResult {
        let cadence = Cadence::detect(series);

        match Self::try_predict(series, model) {
            Ok(forecasts) => {
                debug!("Forecast ({:?}): {:?}", cadence, forecasts);
                PredictionResult {
                    cadence,
                    forecasts,
                    source: ForecastSource::Model,
                }
            }
            Err(e) => {
                let price = series.last_valid_price().unwrap_or(0.0);
                warn!("Prediction failed: {}. Falling back to last price {}", e, price);
                PredictionResult {
                    cadence,
                    forecasts: [price; 4],
                    source: ForecastSource::Degraded { error: e.to_string() },
                }
            }
        }
    }

    fn try_predict(series: &BarSeries, model: &FittedModel) -> Result<[f64; 4]> {
        let frame = FeatureEngineer::engineer(series)?;
        let latest = frame
            .last()
            .ok_or_else(|| ForecastError::Data("No valid data points after preprocessing".to_string()))?;

        let context = model.regressor().context_len().max(1);
        let window: Vec<&FeatureRow> = frame.rows()[frame.len().saturating_sub(context)..].iter().collect();

        let mut features = frame.project(&window, model.schema())?;
        let replaced = sanitize(&mut features);
        if replaced > 0 {
            warn!("Replaced {} non-finite feature values with 0", replaced);
        }
        let scaled = scale_or_refit(model.normalizer(), &features);

        let output = model
            .regressor()
            .predict(&scaled)?
            .last()
            .copied()
            .ok_or_else(|| ForecastError::Data("Model returned no output".to_string()))?;

        let p1 = decode_prediction(model.target_mode(), latest.price, output);
        if !p1.is_finite() {
            return Err(ForecastError::Data(format!("Model produced a non-finite forecast ({})", p1)));
        }

        let sma = |name: &str| {
            frame
                .value(latest, name)
                .ok_or_else(|| ForecastError::SchemaMismatch(name.to_string()))
        };
        let ctx = BlendContext {
            price: latest.price,
            sma5: sma("sma_5")?,
            sma20: sma("sma_20")?,
            sma50: sma("sma_50")?,
        };

        Ok(blend(p1, &ctx))
    }
}
