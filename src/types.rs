use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitoredTarget {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
}

impl MonitoredTarget {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
        }
    }
}

impl Display for MonitoredTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.schema_name, self.table_name, self.column_name
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Min,
    Max,
    Mean,
    P25,
    P50,
    P75,
    P95,
    Stddev,
}

impl MetricName {
    pub const ALL: [MetricName; 8] = [
        MetricName::Min,
        MetricName::Max,
        MetricName::Mean,
        MetricName::P25,
        MetricName::P50,
        MetricName::P75,
        MetricName::P95,
        MetricName::Stddev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::P25 => "p25",
            Self::P50 => "p50",
            Self::P75 => "p75",
            Self::P95 => "p95",
            Self::Stddev => "stddev",
        }
    }
}

impl Display for MetricName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown metric name: {0}")]
pub struct MetricParseError(pub String);

impl FromStr for MetricName {
    type Err = MetricParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "mean" | "avg" => Ok(Self::Mean),
            "p25" => Ok(Self::P25),
            "p50" | "median" => Ok(Self::P50),
            "p75" => Ok(Self::P75),
            "p95" => Ok(Self::P95),
            "stddev" | "std" => Ok(Self::Stddev),
            _ => Err(MetricParseError(s.to_string())),
        }
    }
}

/// Exact matching key between a current snapshot row and its baseline row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub table_name: String,
    pub column_name: String,
    pub metric_name: MetricName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticSnapshot {
    pub table_name: String,
    pub column_name: String,
    pub metric_name: MetricName,
    /// `None` when the aggregate is undefined (empty column, stddev of one value).
    pub metric_value: Option<f64>,
    pub row_count: u64,
    pub captured_at: DateTime<Utc>,
}

impl StatisticSnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            table_name: self.table_name.clone(),
            column_name: self.column_name.clone(),
            metric_name: self.metric_name,
        }
    }
}

/// Outcome handed back to whatever invoked the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub drift_event_count: usize,
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
}
