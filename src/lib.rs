pub mod alert;
pub mod config;
pub mod drift;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod output;
pub mod snapshot;
pub mod source;
pub mod types;

pub use monitor::{DriftMonitor, MonitorSettings, RunOutcome};
pub use types::{MetricName, MonitoredTarget, RunResult, StatisticSnapshot};
