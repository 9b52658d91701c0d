pub mod collector;
pub mod quantile;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::quantile::{mean, percentile_sorted, sample_stddev, sorted_finite};
use crate::types::{MetricName, MonitoredTarget, StatisticSnapshot};

/// Summary statistics over the non-null values of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAggregate {
    pub row_count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p95: Option<f64>,
    pub stddev: Option<f64>,
}

impl ColumnAggregate {
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = sorted_finite(values);
        Self {
            row_count: sorted.len() as u64,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            mean: mean(&sorted),
            p25: percentile_sorted(&sorted, 0.25),
            p50: percentile_sorted(&sorted, 0.50),
            p75: percentile_sorted(&sorted, 0.75),
            p95: percentile_sorted(&sorted, 0.95),
            stddev: sample_stddev(&sorted),
        }
    }

    pub fn value(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::Min => self.min,
            MetricName::Max => self.max,
            MetricName::Mean => self.mean,
            MetricName::P25 => self.p25,
            MetricName::P50 => self.p50,
            MetricName::P75 => self.p75,
            MetricName::P95 => self.p95,
            MetricName::Stddev => self.stddev,
        }
    }

    /// One row per metric, all sharing the aggregate's row count.
    pub fn to_snapshots(
        &self,
        target: &MonitoredTarget,
        captured_at: DateTime<Utc>,
    ) -> Vec<StatisticSnapshot> {
        MetricName::ALL
            .iter()
            .map(|metric| StatisticSnapshot {
                table_name: target.table_name.clone(),
                column_name: target.column_name.clone(),
                metric_name: *metric,
                metric_value: self.value(*metric),
                row_count: self.row_count,
                captured_at,
            })
            .collect()
    }
}
