//! CSV file data adapter.
//!
//! Expects a header row naming `timestamp` (or `date`), `open`, `high`,
//! `low`, `close` and `volume`, in any order.

use crate::domain::error::MltraderError;
use crate::domain::ohlcv::{validate_ordering, Bar};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Accepts date-times, bare dates (midnight) or epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
        })
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Result<usize, MltraderError> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        .ok_or_else(|| MltraderError::Data {
            reason: format!("missing {} column", names[0]),
        })
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<f64, MltraderError> {
    let raw = record.get(idx).ok_or_else(|| MltraderError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })?;
    raw.trim().parse().map_err(|e| MltraderError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self) -> Result<Vec<Bar>, MltraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| MltraderError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| MltraderError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let ts_idx = column_index(&headers, &["timestamp", "date", "datetime"])?;
        let open_idx = column_index(&headers, &["open"])?;
        let high_idx = column_index(&headers, &["high"])?;
        let low_idx = column_index(&headers, &["low"])?;
        let close_idx = column_index(&headers, &["close"])?;
        let volume_idx = column_index(&headers, &["volume"])?;

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| MltraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw_ts = record.get(ts_idx).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| MltraderError::Data {
                reason: format!("line {}: invalid timestamp '{}'", line, raw_ts),
            })?;

            bars.push(Bar {
                timestamp,
                open: parse_field(&record, open_idx, "open", line)?,
                high: parse_field(&record, high_idx, "high", line)?,
                low: parse_field(&record, low_idx, "low", line)?,
                close: parse_field(&record, close_idx, "close", line)?,
                volume: parse_field(&record, volume_idx, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        validate_ordering(&bars)?;
        debug!(path = %self.path.display(), bars = bars.len(), "bars loaded");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_correct_data() {
        let (_dir, path) = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-15 01:00:00,105.0,115.0,100.0,110.0,60000.5\n\
             2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n",
        );
        let bars = CsvAdapter::new(path).fetch_bars().unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, parse_timestamp("2024-01-15 00:00:00").unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[1].volume, 60000.5);
    }

    #[test]
    fn columns_are_found_by_name() {
        let (_dir, path) = write_csv(
            "Date,Close,Open,High,Low,Volume\n\
             2024-01-15,105.0,100.0,110.0,90.0,1\n",
        );
        let bars = CsvAdapter::new(path).fetch_bars().unwrap();
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].open, 100.0);
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let (_dir, path) = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-15,1,1,1,1,1\n\
             2024-01-15,1,1,1,1,1\n",
        );
        let err = CsvAdapter::new(path).fetch_bars().unwrap_err();
        assert!(matches!(err, MltraderError::InvalidData { .. }));
    }

    #[test]
    fn missing_column_is_a_data_error() {
        let (_dir, path) = write_csv("timestamp,open,high,low,close\n2024-01-15,1,1,1,1\n");
        let err = CsvAdapter::new(path).fetch_bars().unwrap_err();
        assert!(matches!(err, MltraderError::Data { .. }));
    }

    #[test]
    fn bad_number_is_a_data_error() {
        let (_dir, path) = write_csv(
            "timestamp,open,high,low,close,volume\n2024-01-15,1,x,1,1,1\n",
        );
        let err = CsvAdapter::new(path).fetch_bars().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let err = CsvAdapter::new(PathBuf::from("/nonexistent/bars.csv"))
            .fetch_bars()
            .unwrap_err();
        assert!(matches!(err, MltraderError::Data { .. }));
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T13:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp(&expected.and_utc().timestamp_millis().to_string()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
