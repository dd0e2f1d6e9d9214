//! Feature engineering from bar series
//!
//! Every feature at row `t` is derived from rows `<= t` only; the three
//! targets are the only forward-looking columns.
//!
//! Features (11 base, 4 more when volume is present):
//! - Returns over 1, 5 and 14 rows
//! - SMA over 5, 10, 20 and 50 rows (minimum period 1)
//! - Price / SMA ratio for the 5 and 20 row SMA
//! - Rolling sample std of the 1-row return over 14 and 30 rows
//! - Volume change, volume MA 5 and 10, volume / volume MA 10

use crate::data::BarSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Base feature names, in schema order
pub const PRICE_FEATURES: [&str; 11] = [
    "return_1",
    "return_5",
    "return_14",
    "sma_5",
    "sma_10",
    "sma_20",
    "sma_50",
    "price_sma5_ratio",
    "price_sma20_ratio",
    "volatility_14",
    "volatility_30",
];

/// Appended when the series carries volume
pub const VOLUME_FEATURES: [&str; 4] = ["volume_change", "volume_ma5", "volume_ma10", "volume_ratio"];

/// Forward offsets of the targets
pub const TARGET_STEPS: [usize; 3] = [1, 7, 30];

/// Ordered feature column names; targets and timestamps are never part of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn for_series(with_volume: bool) -> Self {
        let mut columns: Vec<String> = PRICE_FEATURES.iter().map(|s| s.to_string()).collect();
        if with_volume {
            columns.extend(VOLUME_FEATURES.iter().map(|s| s.to_string()));
        }
        Self { columns }
    }

    pub fn names(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// One engineered row
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    /// Price the features were computed from
    pub price: f64,
    /// Values in schema order, all finite
    pub values: Vec<f64>,
    /// Prices 1, 7 and 30 rows ahead
    pub targets: [Option<f64>; 3],
}

impl FeatureRow {
    pub fn next_price(&self) -> Option<f64> {
        self.targets[0]
    }
}

/// Engineered rows sharing one schema
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
    /// Features without a single finite value
    empty_columns: Vec<String>,
}

impl FeatureFrame {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Features that were undefined on every row, e.g. `volume_change` for
    /// an all-zero volume column
    pub fn empty_columns(&self) -> &[String] {
        &self.empty_columns
    }

    /// Rows that have a 1-step target
    pub fn labelled(&self) -> Vec<&FeatureRow> {
        self.rows.iter().filter(|r| r.next_price().is_some()).collect()
    }

    /// Named feature of a row of this frame
    pub fn value(&self, row: &FeatureRow, name: &str) -> Option<f64> {
        self.schema.index_of(name).and_then(|i| row.values.get(i).copied())
    }

    /// Reorder row values onto `schema`. Fails if a schema column is missing.
    pub fn project(&self, rows: &[&FeatureRow], schema: &FeatureSchema) -> Result<Vec<Vec<f64>>> {
        if schema == &self.schema {
            return Ok(rows.iter().map(|r| r.values.clone()).collect());
        }

        let indices = schema
            .names()
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| ForecastError::SchemaMismatch(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rows
            .iter()
            .map(|r| indices.iter().map(|&i| r.values[i]).collect())
            .collect())
    }
}

/// Builds a [`FeatureFrame`] from bars
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn engineer(series: &BarSeries) -> Result<FeatureFrame> {
        let field = series.price_field();

        let clean: Vec<(DateTime<Utc>, f64, f64)> = series
            .bars()
            .iter()
            .filter_map(|bar| {
                bar.field(field)
                    .filter(|p| p.is_finite())
                    .map(|p| (bar.timestamp, p, bar.volume.unwrap_or(f64::NAN)))
            })
            .collect();

        if clean.is_empty() {
            return Err(ForecastError::Data(format!(
                "No valid values in '{}' column",
                field.as_str()
            )));
        }

        let prices: Vec<f64> = clean.iter().map(|c| c.1).collect();
        let schema = FeatureSchema::for_series(series.has_volume());

        let return_1 = pct_change(&prices, 1);
        let sma_5 = rolling_mean(&prices, 5);
        let sma_20 = rolling_mean(&prices, 20);

        let mut columns: Vec<Vec<f64>> = vec![
            return_1.clone(),
            pct_change(&prices, 5),
            pct_change(&prices, 14),
            sma_5.clone(),
            rolling_mean(&prices, 10),
            sma_20.clone(),
            rolling_mean(&prices, 50),
            ratio(&prices, &sma_5),
            ratio(&prices, &sma_20),
            rolling_std(&return_1, 14),
            rolling_std(&return_1, 30),
        ];

        if series.has_volume() {
            let volumes: Vec<f64> = clean.iter().map(|c| c.2).collect();
            let volume_ma10 = rolling_mean(&volumes, 10);
            let volume_ratio = ratio(&volumes, &volume_ma10);
            columns.extend([
                pct_change(&volumes, 1),
                rolling_mean(&volumes, 5),
                volume_ma10,
                volume_ratio,
            ]);
        }

        let n = prices.len();
        let rows: Vec<FeatureRow> = (0..n)
            .filter_map(|i| {
                let values: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                if values.iter().any(|v| !v.is_finite()) {
                    return None;
                }
                Some(FeatureRow {
                    timestamp: clean[i].0,
                    price: prices[i],
                    values,
                    targets: TARGET_STEPS.map(|step| prices.get(i + step).copied()),
                })
            })
            .collect();

        let empty_columns: Vec<String> = schema
            .names()
            .iter()
            .zip(&columns)
            .filter(|(_, values)| values.iter().all(|v| !v.is_finite()))
            .map(|(name, _)| name.clone())
            .collect();
        if !empty_columns.is_empty() {
            warn!(
                "Features {:?} have no finite values; {} of {} rows kept",
                empty_columns,
                rows.len(),
                n
            );
        }

        Ok(FeatureFrame {
            schema,
            rows,
            empty_columns,
        })
    }
}

/// `values[i] / values[i - period] - 1`, NaN where undefined
pub fn pct_change(values: &[f64], period: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < period {
                f64::NAN
            } else {
                values[i] / values[i - period] - 1.0
            }
        })
        .collect()
}

/// Trailing mean over non-NaN values, minimum one observation
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Trailing sample standard deviation over non-NaN values; NaN below two observations
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let observed: Vec<f64> = values[start..=i].iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.len() < 2 {
                return f64::NAN;
            }
            let n = observed.len() as f64;
            let mean = observed.iter().sum::<f64>() / n;
            let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        })
        .collect()
}

/// Element-wise ratio; a zero denominator yields NaN
fn ratio(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| if *d == 0.0 { f64::NAN } else { n / d })
        .collect()
}
