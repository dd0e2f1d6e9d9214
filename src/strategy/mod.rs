//! Moving-average crossover signals
//!
//! `signal` is 1.0 while the short MA is above the long MA (from row
//! `short_window` on) and `position` marks the changes: +1 on a buy
//! crossover, -1 on a sell crossover.

use crate::config::StrategyConfig;
use crate::data::BarSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// One row of the signal table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub short_mavg: Option<f64>,
    pub long_mavg: Option<f64>,
    pub signal: f64,
    pub position: f64,
}

/// Aggregate view of a signal table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSummary {
    pub total_trades: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    /// First to last price, in percent
    pub price_change_pct: f64,
    pub last_price: f64,
    pub last_short_mavg: Option<f64>,
    pub last_long_mavg: Option<f64>,
}

pub struct MomentumStrategy {
    config: StrategyConfig,
}

impl MomentumStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Signal table over the bars with a valid price
    pub fn generate(&self, series: &BarSeries) -> Result<Vec<SignalRow>> {
        let points: Vec<(DateTime<Utc>, f64)> = series
            .timestamps()
            .zip(series.prices())
            .filter_map(|(ts, price)| price.map(|p| (ts, p)))
            .collect();

        if points.is_empty() {
            return Err(ForecastError::Data(format!(
                "No valid values in '{}' column",
                series.price_field().as_str()
            )));
        }

        let prices: Vec<f64> = points.iter().map(|p| p.1).collect();
        let short_window = self.config.short_window.max(1);
        let short = full_window_mean(&prices, short_window);
        let long = full_window_mean(&prices, self.config.long_window.max(1));

        let signals: Vec<f64> = (0..prices.len())
            .map(|i| match (short[i], long[i]) {
                (Some(s), Some(l)) if i >= short_window && s > l => 1.0,
                _ => 0.0,
            })
            .collect();

        let rows: Vec<SignalRow> = points
            .iter()
            .enumerate()
            .map(|(i, &(timestamp, price))| SignalRow {
                timestamp,
                price,
                short_mavg: short[i],
                long_mavg: long[i],
                signal: signals[i],
                position: if i == 0 { 0.0 } else { signals[i] - signals[i - 1] },
            })
            .collect();

        debug!("Generated {} signal rows", rows.len());
        Ok(rows)
    }

    pub fn summarize(rows: &[SignalRow]) -> Option<SignalSummary> {
        let first = rows.first()?;
        let last = rows.last()?;

        Some(SignalSummary {
            total_trades: rows.iter().filter(|r| r.position != 0.0).count(),
            buy_signals: rows.iter().filter(|r| r.position > 0.0).count(),
            sell_signals: rows.iter().filter(|r| r.position < 0.0).count(),
            price_change_pct: (last.price / first.price - 1.0) * 100.0,
            last_price: last.price,
            last_short_mavg: last.short_mavg,
            last_long_mavg: last.long_mavg,
        })
    }
}

/// Trailing mean, `None` until the window is full
fn full_window_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                Some(values[i + 1 - window..=i].iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use chrono::{Duration, TimeZone};

    fn series(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let mut bar = Bar::new(start + Duration::days(i as i64));
                bar.close = Some(c);
                bar
            })
            .collect();
        BarSeries::from_bars(bars).unwrap()
    }

    fn strategy() -> MomentumStrategy {
        MomentumStrategy::new(StrategyConfig {
            short_window: 2,
            long_window: 4,
        })
    }

    #[test]
    fn test_full_window_mean() {
        let means = full_window_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_crossovers() {
        // falls, rallies, then falls again
        let closes = [10.0, 9.0, 8.0, 7.0, 8.0, 10.0, 12.0, 11.0, 8.0, 6.0, 5.0];
        let rows = strategy().generate(&series(&closes)).unwrap();

        assert_eq!(rows.len(), closes.len());
        assert_eq!(rows[0].position, 0.0);
        assert!(rows[..3].iter().all(|r| r.long_mavg.is_none()));

        let buys: Vec<usize> = rows.iter().enumerate().filter(|(_, r)| r.position > 0.0).map(|(i, _)| i).collect();
        let sells: Vec<usize> = rows.iter().enumerate().filter(|(_, r)| r.position < 0.0).map(|(i, _)| i).collect();
        assert_eq!(buys, vec![5]);
        assert_eq!(sells, vec![8]);

        let summary = MomentumStrategy::summarize(&rows).unwrap();
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.buy_signals, 1);
        assert_eq!(summary.sell_signals, 1);
        assert!((summary.price_change_pct + 50.0).abs() < 1e-9);
        assert_eq!(summary.last_price, 5.0);
        assert_eq!(summary.last_short_mavg, Some(5.5));
    }

    #[test]
    fn test_signal_waits_for_short_window() {
        let strategy = MomentumStrategy::new(StrategyConfig {
            short_window: 3,
            long_window: 1,
        });
        let rows = strategy.generate(&series(&[5.0, 4.0, 3.0, 2.0, 1.0])).unwrap();
        let signals: Vec<f64> = rows.iter().map(|r| r.signal).collect();
        // short MA is already above at row 2
        assert_eq!(signals, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_missing_prices_skipped() {
        let rows = strategy().generate(&series(&[1.0, f64::NAN, 2.0])).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(strategy().generate(&series(&[f64::NAN])).is_err());
        assert!(MomentumStrategy::summarize(&[]).is_none());
    }
}
