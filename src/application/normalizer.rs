// Normalizer - maps legacy column names onto the canonical reading schema
use crate::domain::raw_table::RawTable;
use crate::domain::reading::{Dataset, OUTLIER_NONE, Reading, TimeAxis, TimeValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

const CANONICAL_TIMESTAMP: &str = "timestamp_utc";

/// Candidate source columns per canonical field, first match wins.
pub const TIMESTAMP_SOURCES: &[&str] = &[CANONICAL_TIMESTAMP, "ts_utc_parsed", "ts_utc"];
pub const METRIC_SOURCES: &[&str] = &["metric_type", "dt"];
pub const DEVICE_SOURCES: &[&str] = &["device_id", "ref_d"];
pub const VALUE_SOURCES: &[&str] = &["scaled_value", "scaled_v", "v"];
pub const OUTLIER_SOURCES: &[&str] = &["outlier_type"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("cannot derive canonical column `{field}`: none of {tried:?} present in source")]
    MissingField {
        field: &'static str,
        tried: &'static [&'static str],
    },
}

/// Normalise a raw table into the canonical dataset.
///
/// Missing `timestamp_utc` sources fall back to row ordinals and a missing
/// `outlier_type` column defaults every row to `"none"`. The metric, device and
/// value columns have no default, so their absence is reported here rather
/// than surfacing later in filtering.
pub fn normalize(table: &RawTable) -> Result<Dataset, NormalizeError> {
    let metric_col = require(table, "metric_type", METRIC_SOURCES)?;
    let device_col = require(table, "device_id", DEVICE_SOURCES)?;
    let value_col = require(table, "scaled_value", VALUE_SOURCES)?;
    let timestamp_col = resolve(table, TIMESTAMP_SOURCES);
    let outlier_col = resolve(table, OUTLIER_SOURCES);

    match timestamp_col {
        Some(col) => tracing::debug!("timestamp_utc resolved from `{}`", col),
        None => tracing::warn!("No timestamp column found, using row ordinals as time axis"),
    }
    if outlier_col.is_none() {
        tracing::debug!("No outlier_type column, defaulting every row to \"{}\"", OUTLIER_NONE);
    }

    let readings = (0..table.len())
        .map(|row| {
            let timestamp_utc = match timestamp_col {
                Some(CANONICAL_TIMESTAMP) => parse_timestamp(table.cell(row, CANONICAL_TIMESTAMP)),
                Some(col) => parse_legacy_timestamp(table.cell(row, col)),
                None => TimeValue::Ordinal(row as i64),
            };
            let outlier_type = match outlier_col {
                Some(col) => parse_label(table.cell(row, col)),
                None => Some(OUTLIER_NONE.to_string()),
            };

            Reading::new(
                timestamp_utc,
                parse_label(table.cell(row, metric_col)),
                parse_label(table.cell(row, device_col)),
                parse_number(table.cell(row, value_col)),
                outlier_type,
            )
        })
        .collect::<Vec<_>>();

    let time_axis = TimeAxis::from_values(readings.iter().map(|r| &r.timestamp_utc));

    Ok(Dataset::new(readings, time_axis))
}

fn resolve<'a>(table: &RawTable, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|c| table.has_column(c))
}

fn require(
    table: &RawTable,
    field: &'static str,
    candidates: &'static [&'static str],
) -> Result<&'static str, NormalizeError> {
    let col = resolve(table, candidates).ok_or(NormalizeError::MissingField {
        field,
        tried: candidates,
    })?;
    tracing::debug!("{} resolved from `{}`", field, col);
    Ok(col)
}

/// Coerce a cell to the time axis. Unparseable values pass through as `Raw`.
///
/// Integers are kept as ordinal positions so that a re-exported ordinal axis
/// normalises to itself.
pub fn parse_timestamp(value: &Value) -> TimeValue {
    match value {
        Value::Null => TimeValue::Missing,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                TimeValue::Ordinal(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        TimeValue::Ordinal(f as i64)
                    }
                    _ => TimeValue::Raw(n.to_string()),
                }
            }
        }
        Value::String(s) => parse_timestamp_str(s).unwrap_or_else(|| TimeValue::Raw(s.clone())),
        other => TimeValue::Raw(other.to_string()),
    }
}

/// Legacy `ts_utc*` columns carry integers as epoch milliseconds; everything
/// else is coerced like the canonical column.
pub fn parse_legacy_timestamp(value: &Value) -> TimeValue {
    match value.as_i64().and_then(DateTime::from_timestamp_millis) {
        Some(dt) => TimeValue::Instant(dt),
        None => parse_timestamp(value),
    }
}

fn parse_timestamp_str(s: &str) -> Option<TimeValue> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(TimeValue::Instant(dt.with_timezone(&Utc)));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(TimeValue::Instant(naive.and_utc()));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| TimeValue::Instant(naive.and_utc()))
}

fn parse_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}
