pub mod analyzer;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::{MetricName, RunResult};

pub use analyzer::{analyze, classify, drift_pct};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Exclusive lower bounds, in absolute percent, for each escalated severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning_pct: f64,
    pub critical_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_pct: 20.0,
            critical_pct: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    pub table_name: String,
    pub column_name: String,
    pub metric_name: MetricName,
    pub current_value: f64,
    pub baseline_value: f64,
    pub drift_pct: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub events: Vec<DriftEvent>,
}

impl DriftSummary {
    pub fn has_drift(&self) -> bool {
        self.warning > 0 || self.critical > 0
    }

    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &DriftEvent> {
        self.events.iter().filter(move |e| e.severity == severity)
    }

    pub(crate) fn record(&mut self, event: DriftEvent) {
        match event.severity {
            Severity::Ok => self.ok += 1,
            Severity::Warning => self.warning += 1,
            Severity::Critical => self.critical += 1,
        }
        self.events.push(event);
    }

    pub fn run_result(&self) -> RunResult {
        RunResult {
            drift_event_count: self.events.len(),
            ok: self.ok,
            warning: self.warning,
            critical: self.critical,
        }
    }
}
