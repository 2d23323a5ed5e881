use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{BacktestError, PricePoint, PriceSeries, Result};
use tracing::debug;

/// Load closing prices from a CSV file
///
/// Looks for `Date` and `Close` header columns (case-insensitive), falling
/// back to the first and second columns. Rows before the first parseable
/// date are treated as metadata and skipped, which covers exports that
/// carry ticker/label rows under the header. Rows are sorted by date.
pub fn load_csv(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| BacktestError::CsvError(e.to_string()))?
        .clone();
    let date_col = find_column(&headers, &["date", "datetime", "timestamp"]).unwrap_or(0);
    let close_col = find_column(&headers, &["close", "adj close"]).unwrap_or(1);

    let mut points = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;

        let (Some(date_cell), Some(close_cell)) = (record.get(date_col), record.get(close_col))
        else {
            continue;
        };

        let timestamp = match parse_timestamp(date_cell) {
            Ok(ts) => ts,
            Err(e) => {
                if points.is_empty() {
                    skipped += 1;
                    continue;
                }
                return Err(e);
            }
        };

        let close: f64 = close_cell.parse().map_err(|_| {
            BacktestError::CsvError(format!(
                "Invalid close price '{}' on data row {}",
                close_cell,
                line + 1
            ))
        })?;

        points.push(PricePoint { timestamp, close });
    }

    debug!(rows = points.len(), skipped, path = %path.display(), "loaded csv");

    points.sort_by_key(|p| p.timestamp);
    PriceSeries::new(points)
}

/// Load prices from a JSON array of `{timestamp, close}` objects
pub fn load_json(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path).map_err(|e| BacktestError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut points: Vec<PricePoint> = serde_json::from_reader(reader)?;
    points.sort_by_key(|p| p.timestamp);
    PriceSeries::new(points)
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

/// Parse timestamp from various formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // Try ISO 8601 format first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in &datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
    }

    // Try Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(BacktestError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp_iso() {
        let ts = parse_timestamp("2024-01-15T09:30:00Z").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 15);
    }

    #[test]
    fn test_parse_timestamp_common() {
        let ts = parse_timestamp("2024-01-15 09:30:00").unwrap();
        assert_eq!(ts.hour(), 9);
    }

    #[test]
    fn test_parse_timestamp_date_only() {
        let ts = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 0);

        let ts = parse_timestamp("01/15/2024").unwrap();
        assert_eq!(ts.day(), 15);
    }

    #[test]
    fn test_parse_timestamp_rejects_labels() {
        assert!(parse_timestamp("Ticker").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
