// Sensor reading domain models
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Sentinel outlier label for a normal reading.
pub const OUTLIER_NONE: &str = "none";

/// Value on the canonical time axis.
///
/// Variants are ordered as declared, so a mixed column still sorts
/// deterministically: ordinals, then instants, then raw text, then nulls.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum TimeValue {
    /// Synthesised row position when the source has no time column.
    Ordinal(i64),
    Instant(DateTime<Utc>),
    /// Source value that could not be parsed, kept verbatim.
    Raw(String),
    Missing,
}

impl TimeValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, TimeValue::Missing)
    }
}

/// One row of the dataset in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp_utc: TimeValue,
    pub metric_type: Option<String>,
    pub device_id: Option<String>,
    pub scaled_value: Option<f64>,
    pub outlier_type: Option<String>,
}

impl Reading {
    pub fn new(
        timestamp_utc: TimeValue,
        metric_type: Option<String>,
        device_id: Option<String>,
        scaled_value: Option<f64>,
        outlier_type: Option<String>,
    ) -> Self {
        Self {
            timestamp_utc,
            metric_type,
            device_id,
            scaled_value,
            outlier_type,
        }
    }

    /// A missing label is not the sentinel, so it counts as an outlier.
    pub fn is_outlier(&self) -> bool {
        self.outlier_type.as_deref() != Some(OUTLIER_NONE)
    }
}

/// Whether the time axis holds real timestamps or row positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxis {
    Timestamp,
    Ordinal,
}

impl TimeAxis {
    /// An axis of ordinals and gaps only is ordinal, whatever column it came from.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a TimeValue>) -> Self {
        let ordinal = values
            .into_iter()
            .all(|v| v.is_missing() || matches!(v, TimeValue::Ordinal(_)));
        if ordinal {
            TimeAxis::Ordinal
        } else {
            TimeAxis::Timestamp
        }
    }
}

/// The full, normalised dataset. Read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    readings: Vec<Reading>,
    metric_domain: Vec<String>,
    time_axis: TimeAxis,
}

impl Dataset {
    pub fn new(readings: Vec<Reading>, time_axis: TimeAxis) -> Self {
        let metric_domain = readings
            .iter()
            .filter_map(|r| r.metric_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            readings,
            metric_domain,
            time_axis,
        }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Sorted distinct metric types across the whole dataset.
    pub fn metric_domain(&self) -> &[String] {
        &self.metric_domain
    }

    pub fn time_axis(&self) -> TimeAxis {
        self.time_axis
    }

    pub fn device_count(&self) -> usize {
        self.readings
            .iter()
            .filter_map(|r| r.device_id.as_deref())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
