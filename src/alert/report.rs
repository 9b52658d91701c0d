use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::drift::{DriftEvent, DriftSummary, Severity, Thresholds};

pub const DEFAULT_TOP_CRITICAL: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Stable,
    DriftDetected,
}

/// Alert content for one run. Delivery is left to whoever consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftReport {
    pub status: ReportStatus,
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub thresholds: Thresholds,
    pub top_critical: Vec<DriftEvent>,
}

pub fn build_report(summary: &DriftSummary, thresholds: Thresholds, top_n: usize) -> DriftReport {
    let status = if summary.has_drift() {
        ReportStatus::DriftDetected
    } else {
        ReportStatus::Stable
    };
    let top_critical = summary
        .by_severity(Severity::Critical)
        .take(top_n)
        .cloned()
        .collect();
    DriftReport {
        status,
        ok: summary.ok,
        warning: summary.warning,
        critical: summary.critical,
        thresholds,
        top_critical,
    }
}

/// `orders.price.mean: 100.00 -> 160.00 (+60.0%)`
pub fn format_event(event: &DriftEvent) -> String {
    format!(
        "{}.{}.{}: {:.2} -> {:.2} ({:+.1}%)",
        event.table_name,
        event.column_name,
        event.metric_name,
        event.baseline_value,
        event.current_value,
        event.drift_pct
    )
}

impl DriftReport {
    pub fn is_stable(&self) -> bool {
        self.status == ReportStatus::Stable
    }

    pub fn lines(&self) -> Vec<String> {
        if self.is_stable() {
            return vec!["no significant drift detected; system stable, no action needed".to_string()];
        }
        let mut lines = vec![
            "DATA DRIFT DETECTED".to_string(),
            format!(
                "WARNING: {} metrics with drift > {}%",
                self.warning, self.thresholds.warning_pct
            ),
            format!(
                "CRITICAL: {} metrics with drift > {}%",
                self.critical, self.thresholds.critical_pct
            ),
        ];
        if !self.top_critical.is_empty() {
            lines.push("top critical drifts:".to_string());
            lines.extend(self.top_critical.iter().map(|e| format!("  - {}", format_event(e))));
        }
        lines
    }

    pub fn log(&self) {
        if self.is_stable() {
            for line in self.lines() {
                info!("{line}");
            }
        } else {
            for line in self.lines() {
                warn!("{line}");
            }
        }
    }
}
