pub mod migrations;
pub mod store;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::BaselineUnavailable;
use crate::types::{SnapshotKey, StatisticSnapshot};

/// Trailing window around "N days ago" that a baseline is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineWindow {
    pub window_days: u32,
    pub tolerance_days: u32,
}

impl Default for BaselineWindow {
    fn default() -> Self {
        Self {
            window_days: 7,
            tolerance_days: 1,
        }
    }
}

impl BaselineWindow {
    /// Inclusive `[from, to]` range, both ends at midnight UTC.
    pub fn bounds(&self, as_of: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = as_of.date_naive();
        let oldest = self.window_days.saturating_add(self.tolerance_days);
        let newest = self.window_days.saturating_sub(self.tolerance_days);
        let midnight = |days_back: u32| {
            let date = today - Duration::days(i64::from(days_back));
            Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        };
        (midnight(oldest), midnight(newest))
    }
}

/// Latest snapshot per (table, column, metric) inside the window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    rows: BTreeMap<SnapshotKey, StatisticSnapshot>,
}

impl Baseline {
    pub fn from_rows(rows: impl IntoIterator<Item = StatisticSnapshot>) -> Self {
        let mut latest: BTreeMap<SnapshotKey, StatisticSnapshot> = BTreeMap::new();
        for row in rows {
            match latest.entry(row.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
                Entry::Occupied(mut slot) => {
                    if row.captured_at > slot.get().captured_at {
                        slot.insert(row);
                    }
                }
            }
        }
        Self { rows: latest }
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<&StatisticSnapshot> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &StatisticSnapshot> {
        self.rows.values()
    }
}

/// Append-only store of statistic snapshots. Calls block; async callers run
/// them on the blocking pool.
pub trait SnapshotRepository: Send + Sync {
    /// Appends every row stamped with `captured_at`; returns the rows written.
    fn save(&self, snapshots: &[StatisticSnapshot], captured_at: DateTime<Utc>) -> Result<usize>;

    /// Rows captured inside `[from, to]`, newest first.
    fn snapshots_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatisticSnapshot>>;

    /// Never fails: an empty window or a storage error both mean "no baseline".
    fn baseline(&self, as_of: DateTime<Utc>, window: BaselineWindow) -> Option<Baseline> {
        let (from, to) = window.bounds(as_of);
        match self.snapshots_between(from, to) {
            Ok(rows) if rows.is_empty() => {
                info!(%from, %to, "{}; establishing baseline", BaselineUnavailable::EmptyWindow);
                None
            }
            Ok(rows) => {
                let baseline = Baseline::from_rows(rows);
                info!(%from, %to, metrics = baseline.len(), "loaded baseline");
                Some(baseline)
            }
            Err(err) => {
                error!("{}", BaselineUnavailable::Storage(format!("{err:#}")));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Baseline, BaselineWindow};
    use crate::types::{MetricName, StatisticSnapshot};

    fn row(value: f64, hours_ago: i64) -> StatisticSnapshot {
        StatisticSnapshot {
            table_name: "orders".to_string(),
            column_name: "price".to_string(),
            metric_name: MetricName::Mean,
            metric_value: Some(value),
            row_count: 10,
            captured_at: Utc.with_ymd_and_hms(2026, 10, 9, 12, 0, 0).unwrap()
                - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn window_spans_eight_to_six_days_back() {
        let as_of = Utc.with_ymd_and_hms(2026, 10, 16, 7, 30, 0).unwrap();
        let (from, to) = BaselineWindow::default().bounds(as_of);
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 10, 8, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 10, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn dedup_keeps_the_most_recent_row_regardless_of_order() {
        let baseline = Baseline::from_rows(vec![row(1.0, 30), row(3.0, 2), row(2.0, 10)]);
        assert_eq!(baseline.len(), 1);
        let kept = baseline.snapshots().next().unwrap();
        assert_eq!(kept.metric_value, Some(3.0));
    }
}
