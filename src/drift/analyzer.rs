use tracing::{debug, info};

use crate::drift::{DriftEvent, DriftSummary, Severity, Thresholds};
use crate::snapshot::Baseline;
use crate::types::StatisticSnapshot;

/// Signed percent change from `baseline` to `current`; undefined for a zero baseline.
pub fn drift_pct(current: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}

pub fn classify(drift_pct: f64, thresholds: &Thresholds) -> Severity {
    let drift_abs = drift_pct.abs();
    if drift_abs > thresholds.critical_pct {
        Severity::Critical
    } else if drift_abs > thresholds.warning_pct {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Compares the current run against the baseline. Pure: no I/O, no state.
///
/// Without a baseline every current metric counts as OK and no events are
/// produced. Otherwise a metric is skipped when its key is missing from the
/// baseline, when either value is null, or when the baseline value is zero.
pub fn analyze(
    current: &[StatisticSnapshot],
    baseline: Option<&Baseline>,
    thresholds: &Thresholds,
) -> DriftSummary {
    let Some(baseline) = baseline.filter(|b| !b.is_empty()) else {
        info!(metrics = current.len(), "no baseline yet; recording current statistics only");
        return DriftSummary {
            ok: current.len(),
            ..DriftSummary::default()
        };
    };

    let mut summary = DriftSummary::default();
    for snapshot in current {
        let Some(previous) = baseline.get(&snapshot.key()) else {
            debug!(
                table = %snapshot.table_name,
                column = %snapshot.column_name,
                metric = %snapshot.metric_name,
                "no baseline counterpart"
            );
            continue;
        };
        let (Some(current_value), Some(baseline_value)) =
            (snapshot.metric_value, previous.metric_value)
        else {
            continue;
        };
        let Some(drift_pct) = drift_pct(current_value, baseline_value) else {
            continue;
        };

        summary.record(DriftEvent {
            table_name: snapshot.table_name.clone(),
            column_name: snapshot.column_name.clone(),
            metric_name: snapshot.metric_name,
            current_value,
            baseline_value,
            drift_pct,
            severity: classify(drift_pct, thresholds),
        });
    }

    info!(
        ok = summary.ok,
        warning = summary.warning,
        critical = summary.critical,
        "drift detection finished"
    );
    summary
}
