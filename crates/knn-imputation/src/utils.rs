//! Shared utilities for reading tables out of polars frames.
//!
//! This module contains dtype helpers and the timestamp parser used for
//! string time columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Read a numeric column as `f64` values; nulls and non-finite values become `None`.
pub fn column_to_f64(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let float_column = column.cast(&DataType::Float64)?;
    Ok(float_column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

// =============================================================================
// Timestamp Parsing
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Layout {
    DateTime(&'static str),
    Date(&'static str),
}

// Shape of the string -> chrono layouts to try, compiled once
static TIMESTAMP_LAYOUTS: Lazy<Vec<(Regex, Vec<Layout>)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?$")
                .expect("Invalid regex: ISO datetime"),
            vec![
                Layout::DateTime("%Y-%m-%d %H:%M:%S%.f"),
                Layout::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
            ],
        ),
        (
            Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}$").expect("Invalid regex: ISO minutes"),
            vec![
                Layout::DateTime("%Y-%m-%d %H:%M"),
                Layout::DateTime("%Y-%m-%dT%H:%M"),
            ],
        ),
        (
            Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
            vec![Layout::Date("%Y-%m-%d"), Layout::Date("%Y/%m/%d")],
        ),
        (
            Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4} \d{1,2}:\d{2}(:\d{2})?$")
                .expect("Invalid regex: DD.MM.YYYY time"),
            vec![
                Layout::DateTime("%d.%m.%Y %H:%M:%S"),
                Layout::DateTime("%d.%m.%Y %H:%M"),
            ],
        ),
        (
            Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").expect("Invalid regex: DD.MM.YYYY"),
            vec![Layout::Date("%d.%m.%Y")],
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}(:\d{2})?$")
                .expect("Invalid regex: MM/DD/YYYY time"),
            vec![
                Layout::DateTime("%m/%d/%Y %H:%M:%S"),
                Layout::DateTime("%m/%d/%Y %H:%M"),
            ],
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Invalid regex: MM/DD/YYYY"),
            vec![Layout::Date("%m/%d/%Y")],
        ),
    ]
});

/// Parse a timestamp string into milliseconds since the Unix epoch.
///
/// Accepts RFC 3339 (with offset), ISO-like `YYYY-MM-DD[ HH:MM[:SS[.f]]]`,
/// `DD.MM.YYYY[ HH:MM[:SS]]` and `MM/DD/YYYY[ HH:MM[:SS]]`. Values without an
/// offset are read as UTC.
pub fn parse_timestamp_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    TIMESTAMP_LAYOUTS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(s))
        .flat_map(|(_, layouts)| layouts.iter())
        .find_map(|layout| match *layout {
            Layout::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            Layout::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        })
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Milliseconds per unit of a polars datetime.
pub fn to_millis(value: i64, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Nanoseconds => value.div_euclid(1_000_000),
        TimeUnit::Microseconds => value.div_euclid(1_000),
        TimeUnit::Milliseconds => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int32));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_datetime_dtype() {
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&DataType::Datetime(
            TimeUnit::Milliseconds,
            None
        )));
        assert!(!is_datetime_dtype(&DataType::Int64));
    }

    #[test]
    fn test_column_to_f64_casts_and_drops_nan() {
        let column = Column::new("v".into(), &[Some(1.0), None, Some(f64::NAN)]);
        assert_eq!(column_to_f64(&column).unwrap(), vec![Some(1.0), None, None]);

        let ints = Column::new("i".into(), &[Some(3i64), None]);
        assert_eq!(column_to_f64(&ints).unwrap(), vec![Some(3.0), None]);
    }

    #[test]
    fn test_parse_iso_datetime() {
        let base = parse_timestamp_ms("2024-01-01 00:00:00").unwrap();
        assert_eq!(parse_timestamp_ms("2024-01-01T01:00:00"), Some(base + 3_600_000));
        assert_eq!(parse_timestamp_ms("2024-01-01 00:30"), Some(base + 1_800_000));
        assert_eq!(parse_timestamp_ms("2024-01-01 00:00:00.250"), Some(base + 250));
        assert_eq!(parse_timestamp_ms("2024-01-01"), Some(base));
        assert_eq!(parse_timestamp_ms("2024/01/01"), Some(base));
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let utc = parse_timestamp_ms("2024-01-01 00:00:00").unwrap();
        assert_eq!(parse_timestamp_ms("2024-01-01T03:00:00+03:00"), Some(utc));
    }

    #[test]
    fn test_parse_day_first_dotted() {
        let iso = parse_timestamp_ms("2023-03-15 14:20:00").unwrap();
        assert_eq!(parse_timestamp_ms("15.03.2023 14:20"), Some(iso));
        assert_eq!(parse_timestamp_ms("15.03.2023 14:20:00"), Some(iso));
        assert_eq!(
            parse_timestamp_ms("15.03.2023"),
            parse_timestamp_ms("2023-03-15")
        );
    }

    #[test]
    fn test_parse_month_first_slashed() {
        assert_eq!(
            parse_timestamp_ms("03/15/2023 14:20"),
            parse_timestamp_ms("2023-03-15 14:20")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp_ms(""), None);
        assert_eq!(parse_timestamp_ms("yesterday"), None);
        assert_eq!(parse_timestamp_ms("2024-13-45"), None);
    }

    #[test]
    fn test_to_millis() {
        assert_eq!(to_millis(1_500_000_000, TimeUnit::Nanoseconds), 1_500);
        assert_eq!(to_millis(1_500_000, TimeUnit::Microseconds), 1_500);
        assert_eq!(to_millis(1_500, TimeUnit::Milliseconds), 1_500);
    }
}
