//! Bar data model
//!
//! A [`BarSeries`] is the validated input to the whole pipeline: non-empty,
//! strictly increasing timestamps, and at least one column that can serve as
//! the price (close, then adjusted close, then a generic price column).

mod loader;

pub use loader::{load_csv, LoadOptions};

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Column used as the price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Close,
    AdjClose,
    Price,
}

impl PriceField {
    /// Resolution order when picking the price column
    pub const PRIORITY: [PriceField; 3] = [PriceField::Close, PriceField::AdjClose, PriceField::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Close => "close",
            PriceField::AdjClose => "adj_close",
            PriceField::Price => "price",
        }
    }
}

/// Which columns the series carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Columns {
    pub open: bool,
    pub high: bool,
    pub low: bool,
    pub close: bool,
    pub adj_close: bool,
    pub price: bool,
    pub volume: bool,
}

impl Columns {
    /// Standard OHLCV layout
    pub fn ohlcv() -> Self {
        Self {
            open: true,
            high: true,
            low: true,
            close: true,
            volume: true,
            ..Default::default()
        }
    }

    /// Infer columns from the values present on any bar (NaN counts as present)
    pub fn infer(bars: &[Bar]) -> Self {
        let mut columns = Self::default();
        for bar in bars {
            columns.open |= bar.open.is_some();
            columns.high |= bar.high.is_some();
            columns.low |= bar.low.is_some();
            columns.close |= bar.close.is_some();
            columns.adj_close |= bar.adj_close.is_some();
            columns.price |= bar.price.is_some();
            columns.volume |= bar.volume.is_some();
        }
        columns
    }

    pub fn has(&self, field: PriceField) -> bool {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
            PriceField::Price => self.price,
        }
    }

    /// First available price column in priority order
    pub fn resolve_price(&self) -> Option<PriceField> {
        PriceField::PRIORITY.into_iter().find(|f| self.has(*f))
    }
}

/// Single OHLCV observation
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub price: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            price: None,
            volume: None,
        }
    }

    /// Fully populated OHLCV bar
    pub fn ohlcv(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            ..Self::new(timestamp)
        }
    }

    pub fn field(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
            PriceField::Price => self.price,
        }
    }

    /// Any finite price-like value, preferring the price columns over OHLC
    fn any_price(&self) -> Option<f64> {
        [self.close, self.adj_close, self.price, self.open, self.high, self.low]
            .into_iter()
            .flatten()
            .find(|v| v.is_finite())
    }
}

/// Validated, chronologically ordered bars
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Vec<Bar>,
    columns: Columns,
    price_field: PriceField,
}

impl BarSeries {
    /// Build a series with an explicit column set
    pub fn new(bars: Vec<Bar>, columns: Columns) -> Result<Self> {
        if bars.is_empty() {
            return Err(ForecastError::Data("Bar series is empty".to_string()));
        }

        if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(ForecastError::Data(format!(
                "Timestamps must be strictly increasing: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }

        let price_field = columns.resolve_price().ok_or_else(|| {
            ForecastError::Data("Could not find close, adjusted close or price column".to_string())
        })?;

        Ok(Self {
            bars,
            columns,
            price_field,
        })
    }

    /// Build a series, inferring columns from the bars
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self> {
        let columns = Columns::infer(&bars);
        Self::new(bars, columns)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn columns(&self) -> Columns {
        self.columns
    }

    pub fn price_field(&self) -> PriceField {
        self.price_field
    }

    pub fn has_volume(&self) -> bool {
        self.columns.volume
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.bars.iter().map(|b| b.timestamp)
    }

    /// Resolved price per bar; missing and non-finite values are `None`
    pub fn prices(&self) -> Vec<Option<f64>> {
        self.bars
            .iter()
            .map(|b| b.field(self.price_field).filter(|v| v.is_finite()))
            .collect()
    }

    /// Last finite price, falling back to any price-like field when the
    /// resolved column has no usable value
    pub fn last_valid_price(&self) -> Option<f64> {
        self.bars
            .iter()
            .rev()
            .find_map(|b| b.field(self.price_field).filter(|v| v.is_finite()))
            .or_else(|| self.bars.iter().rev().find_map(Bar::any_price))
    }

    /// Median spacing between consecutive bars (mean of the middle pair for
    /// an even count). `None` for a single bar.
    pub fn median_spacing(&self) -> Option<Duration> {
        let mut deltas: Vec<i64> = self
            .bars
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_milliseconds())
            .collect();

        if deltas.is_empty() {
            return None;
        }

        deltas.sort_unstable();
        let mid = deltas.len() / 2;
        let median = if deltas.len() % 2 == 0 {
            (deltas[mid - 1] + deltas[mid]) / 2
        } else {
            deltas[mid]
        };
        Some(Duration::milliseconds(median))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    #[test]
    fn test_empty_series_rejected() {
        let err = BarSeries::from_bars(vec![]).unwrap_err();
        assert!(matches!(err, ForecastError::Data(_)));
    }

    #[test]
    fn test_unordered_timestamps_rejected() {
        let bars = vec![
            Bar::ohlcv(ts(1), 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::ohlcv(ts(0), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        assert!(BarSeries::from_bars(bars).is_err());

        let bars = vec![
            Bar::ohlcv(ts(0), 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::ohlcv(ts(0), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        assert!(BarSeries::from_bars(bars).is_err());
    }

    #[test]
    fn test_price_field_resolution() {
        let mut bar = Bar::new(ts(0));
        bar.adj_close = Some(10.0);
        bar.price = Some(11.0);
        let series = BarSeries::from_bars(vec![bar]).unwrap();
        assert_eq!(series.price_field(), PriceField::AdjClose);

        let mut bar = Bar::new(ts(0));
        bar.price = Some(11.0);
        let series = BarSeries::from_bars(vec![bar]).unwrap();
        assert_eq!(series.price_field(), PriceField::Price);
    }

    #[test]
    fn test_no_price_column_rejected() {
        let mut bar = Bar::new(ts(0));
        bar.open = Some(1.0);
        bar.volume = Some(100.0);
        let err = BarSeries::from_bars(vec![bar]).unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn test_last_valid_price_skips_nan() {
        let mut bars: Vec<Bar> = (0..3)
            .map(|i| Bar::ohlcv(ts(i), 1.0, 2.0, 0.5, 10.0 + i as f64, 5.0))
            .collect();
        bars[2].close = Some(f64::NAN);
        let series = BarSeries::from_bars(bars).unwrap();
        assert_eq!(series.last_valid_price(), Some(11.0));
    }

    #[test]
    fn test_last_valid_price_falls_back_to_open() {
        let bars: Vec<Bar> = (0..3)
            .map(|i| {
                let mut bar = Bar::new(ts(i));
                bar.open = Some(50.0 + i as f64);
                bar.close = Some(f64::NAN);
                bar
            })
            .collect();
        let series = BarSeries::from_bars(bars).unwrap();
        assert_eq!(series.price_field(), PriceField::Close);
        assert_eq!(series.last_valid_price(), Some(52.0));
    }

    #[test]
    fn test_median_spacing() {
        let bars: Vec<Bar> = [0, 1, 2, 4]
            .iter()
            .map(|&h| Bar::ohlcv(ts(h), 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        let series = BarSeries::from_bars(bars).unwrap();
        assert_eq!(series.median_spacing(), Some(Duration::hours(1)));

        let single = BarSeries::from_bars(vec![Bar::ohlcv(ts(0), 1.0, 1.0, 1.0, 1.0, 1.0)]).unwrap();
        assert_eq!(single.median_spacing(), None);
    }
}
