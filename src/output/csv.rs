use anyhow::Result;

use crate::drift::DriftEvent;
use crate::types::StatisticSnapshot;

pub fn events_to_csv(events: &[DriftEvent]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "table_name",
        "column_name",
        "metric_name",
        "baseline_value",
        "current_value",
        "drift_pct",
        "severity",
    ])?;
    for event in events {
        writer.write_record([
            event.table_name.clone(),
            event.column_name.clone(),
            event.metric_name.to_string(),
            event.baseline_value.to_string(),
            event.current_value.to_string(),
            format!("{:.4}", event.drift_pct),
            event.severity.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn snapshots_to_csv(snapshots: &[StatisticSnapshot]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "table_name",
        "column_name",
        "metric_name",
        "metric_value",
        "row_count",
        "captured_at",
    ])?;
    for snapshot in snapshots {
        writer.write_record([
            snapshot.table_name.clone(),
            snapshot.column_name.clone(),
            snapshot.metric_name.to_string(),
            snapshot
                .metric_value
                .map(|v| v.to_string())
                .unwrap_or_default(),
            snapshot.row_count.to_string(),
            snapshot.captured_at.to_rfc3339(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{events_to_csv, snapshots_to_csv};
    use crate::drift::{DriftEvent, Severity};
    use crate::types::{MetricName, StatisticSnapshot};

    #[test]
    fn events_csv_has_header_and_severity_labels() {
        let csv = events_to_csv(&[DriftEvent {
            table_name: "orders".to_string(),
            column_name: "price".to_string(),
            metric_name: MetricName::P95,
            current_value: 125.0,
            baseline_value: 100.0,
            drift_pct: 25.0,
            severity: Severity::Warning,
        }])
        .unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("table_name,column_name"));
        assert_eq!(
            lines.next().unwrap(),
            "orders,price,p95,100,125,25.0000,WARNING"
        );
    }

    #[test]
    fn null_metric_values_render_empty() {
        let csv = snapshots_to_csv(&[StatisticSnapshot {
            table_name: "orders".to_string(),
            column_name: "price".to_string(),
            metric_name: MetricName::Stddev,
            metric_value: None,
            row_count: 1,
            captured_at: Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap(),
        }])
        .unwrap();
        assert!(csv.contains("orders,price,stddev,,1,2026-10-16T07:00:00+00:00"));
    }
}
