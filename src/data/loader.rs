//! CSV bar loader

use super::{Bar, BarSeries, Columns};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for reading bar files
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit date format tried before the built-in list
    pub date_format: Option<String>,
    /// CSV delimiter character
    pub delimiter: u8,
    /// Skip rows with unparseable timestamps instead of failing
    pub skip_invalid: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            date_format: None,
            delimiter: b',',
            skip_invalid: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Price,
    Volume,
}

fn classify_header(header: &str) -> Option<Column> {
    let normalized = header.trim().to_ascii_lowercase().replace(['_', '-'], " ");
    match normalized.as_str() {
        "date" | "datetime" | "timestamp" | "time" => Some(Column::Timestamp),
        "open" | "o" => Some(Column::Open),
        "high" | "h" => Some(Column::High),
        "low" | "l" => Some(Column::Low),
        "close" | "c" => Some(Column::Close),
        "adj close" | "adjclose" | "adjusted close" => Some(Column::AdjClose),
        "price" => Some(Column::Price),
        "volume" | "v" => Some(Column::Volume),
        _ => None,
    }
}

fn parse_datetime(s: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for fmt in &date_formats {
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    if let Some(dt) = s.parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        return Ok(dt);
    }

    Err(ForecastError::Data(format!("Could not parse date: '{}'", s)))
}

/// Empty cells become `None`, unparseable ones NaN
fn parse_value(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    let raw = record.get(idx?)?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().or(Some(f64::NAN))
}

/// Load bars from a CSV file with a header row
pub fn load_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<BarSeries> {
    let path = path.as_ref();
    info!("Loading bars from: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let find = |wanted: Column| headers.iter().position(|h| classify_header(h) == Some(wanted));

    let ts_idx = find(Column::Timestamp)
        .ok_or_else(|| ForecastError::Data("No date/timestamp column in header".to_string()))?;
    let open_idx = find(Column::Open);
    let high_idx = find(Column::High);
    let low_idx = find(Column::Low);
    let close_idx = find(Column::Close);
    let adj_idx = find(Column::AdjClose);
    let price_idx = find(Column::Price);
    let volume_idx = find(Column::Volume);

    let columns = Columns {
        open: open_idx.is_some(),
        high: high_idx.is_some(),
        low: low_idx.is_some(),
        close: close_idx.is_some(),
        adj_close: adj_idx.is_some(),
        price: price_idx.is_some(),
        volume: volume_idx.is_some(),
    };

    let mut bars = Vec::new();
    let mut skipped = 0;

    for (row_num, result) in reader.records().enumerate() {
        let record = result?;
        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let timestamp = match parse_datetime(raw_ts, options.date_format.as_deref()) {
            Ok(ts) => ts,
            Err(e) if options.skip_invalid => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        bars.push(Bar {
            timestamp,
            open: parse_value(&record, open_idx),
            high: parse_value(&record, high_idx),
            low: parse_value(&record, low_idx),
            close: parse_value(&record, close_idx),
            adj_close: parse_value(&record, adj_idx),
            price: parse_value(&record, price_idx),
            volume: parse_value(&record, volume_idx),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} rows with invalid timestamps", skipped);
    }

    bars.sort_by_key(|b| b.timestamp);
    let original_len = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < original_len {
        warn!("Removed {} duplicate timestamps", original_len - bars.len());
    }

    info!("Loaded {} bars", bars.len());
    BarSeries::new(bars, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceField;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sorts_and_dedups() {
        let file = write_csv(
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,3,3,3,3,300\n\
             2024-01-01,1,1,1,1,100\n\
             2024-01-02,2,2,2,2,200\n\
             2024-01-02,2,2,2,2,200\n",
        );
        let series = load_csv(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(series.len(), 3);
        let closes: Vec<f64> = series.bars().iter().filter_map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert!(series.has_volume());
    }

    #[test]
    fn test_adj_close_header_without_close() {
        let file = write_csv(
            "timestamp,Adj Close\n\
             2024-01-01 10:00:00,10.5\n\
             2024-01-01 11:00:00,\n",
        );
        let series = load_csv(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(series.price_field(), PriceField::AdjClose);
        assert!(!series.has_volume());
        assert_eq!(series.bars()[1].adj_close, None);
    }

    #[test]
    fn test_invalid_dates_skipped() {
        let file = write_csv(
            "Date,Close\n\
             not-a-date,1\n\
             1704067200,2\n",
        );
        let series = load_csv(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(series.len(), 1);

        let strict = LoadOptions {
            skip_invalid: false,
            ..Default::default()
        };
        assert!(load_csv(file.path(), &strict).is_err());
    }

    #[test]
    fn test_missing_price_columns() {
        let file = write_csv("Date,Volume\n2024-01-01,100\n");
        let err = load_csv(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::Data(_)));
    }
}
