use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::alert::{build_report, DriftReport, DEFAULT_TOP_CRITICAL};
use crate::config::Config;
use crate::drift::{analyze, DriftSummary, Thresholds};
use crate::error::PersistenceError;
use crate::metrics::collector::extract_snapshots_concurrent;
use crate::snapshot::store::SnapshotStore;
use crate::snapshot::{BaselineWindow, SnapshotRepository};
use crate::source::ColumnSource;
use crate::types::{MonitoredTarget, RunResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub thresholds: Thresholds,
    pub window: BaselineWindow,
    pub max_parallel: usize,
    pub top_critical: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            window: BaselineWindow::default(),
            max_parallel: 1,
            top_critical: DEFAULT_TOP_CRITICAL,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds(),
            window: config.baseline_window(),
            max_parallel: config.extraction.max_parallel,
            top_critical: config.alerts.top_critical,
        }
    }
}

/// Everything one run produced, for callers that want more than the counters.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub captured_at: DateTime<Utc>,
    pub saved: usize,
    pub summary: DriftSummary,
    pub report: DriftReport,
    pub result: RunResult,
}

pub struct DriftMonitor {
    targets: Vec<MonitoredTarget>,
    source: Arc<dyn ColumnSource>,
    store: Arc<dyn SnapshotRepository>,
    settings: MonitorSettings,
}

impl DriftMonitor {
    pub fn new(
        targets: Vec<MonitoredTarget>,
        source: Arc<dyn ColumnSource>,
        store: Arc<dyn SnapshotRepository>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            targets,
            source,
            store,
            settings,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = SnapshotStore::open(&config.resolved_store_path())?;
        Ok(Self::new(
            config.monitored_targets()?,
            Arc::new(config.column_source()),
            Arc::new(store),
            MonitorSettings::from_config(config),
        ))
    }

    pub fn targets(&self) -> &[MonitoredTarget] {
        &self.targets
    }

    pub async fn run(&self) -> Result<RunResult> {
        Ok(self.run_at(Utc::now()).await?.result)
    }

    /// Extract, read the baseline, analyze, persist, report. The baseline is
    /// read before this run's rows are written. Only a failed write is fatal.
    /// Source queries and store calls all run on the blocking pool.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        info!(targets = self.targets.len(), "starting drift monitoring run");

        let current = extract_snapshots_concurrent(
            Arc::clone(&self.source),
            &self.targets,
            now,
            self.settings.max_parallel,
        )
        .await;
        let store = Arc::clone(&self.store);
        let window = self.settings.window;
        let baseline = tokio::task::spawn_blocking(move || store.baseline(now, window))
            .await
            .unwrap_or_else(|join_err| {
                error!("baseline lookup aborted: {join_err}");
                None
            });

        let summary = analyze(&current, baseline.as_ref(), &self.settings.thresholds);

        let count = current.len();
        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || store.save(&current, now))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|written| written)
            .map_err(|err| PersistenceError {
                count,
                message: format!("{err:#}"),
            })?;

        let report = build_report(&summary, self.settings.thresholds, self.settings.top_critical);
        report.log();

        let result = summary.run_result();
        info!(
            events = result.drift_event_count,
            ok = result.ok,
            warning = result.warning,
            critical = result.critical,
            "drift monitoring run finished"
        );
        Ok(RunOutcome {
            captured_at: now,
            saved,
            summary,
            report,
            result,
        })
    }
}
