use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::drift::Thresholds;
use crate::snapshot::BaselineWindow;
use crate::source::SqliteColumnSource;
use crate::types::MonitoredTarget;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// `"schema.table"` to the columns watched in it.
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_db_path")]
    pub db_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Schema name to the database file attached under it.
    #[serde(default = "default_attach")]
    pub attach: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_pct: f64,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold_pct: f64,
    #[serde(default = "default_baseline_window_days")]
    pub baseline_window_days: u32,
    #[serde(default = "default_baseline_tolerance_days")]
    pub baseline_tolerance_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_top_critical")]
    pub top_critical: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_db: Option<String>,
    pub store_db: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/drift-monitor/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(source_db) = overrides.source_db {
            self.source.db_path = source_db;
        }
        if let Some(store_db) = overrides.store_db {
            self.storage.db_path = store_db;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let targets = self.monitored_targets()?;
        if targets.is_empty() {
            bail!("no columns configured under [targets]");
        }
        let drift = &self.drift;
        if drift.warning_threshold_pct.is_nan() || drift.warning_threshold_pct < 0.0 {
            bail!(
                "warning_threshold_pct must be non-negative, got {}",
                drift.warning_threshold_pct
            );
        }
        if drift.critical_threshold_pct.is_nan()
            || drift.warning_threshold_pct >= drift.critical_threshold_pct
        {
            bail!(
                "warning_threshold_pct ({}) must be below critical_threshold_pct ({})",
                drift.warning_threshold_pct,
                drift.critical_threshold_pct
            );
        }
        if drift.baseline_tolerance_days >= drift.baseline_window_days {
            bail!(
                "baseline_tolerance_days ({}) must be smaller than baseline_window_days ({})",
                drift.baseline_tolerance_days,
                drift.baseline_window_days
            );
        }
        Ok(())
    }

    /// Expands `[targets]` into one target per column, in key order.
    ///
    /// Snapshots are keyed by table and column without the schema, so the same
    /// `table.column` may be watched under one schema only.
    pub fn monitored_targets(&self) -> Result<Vec<MonitoredTarget>> {
        let mut targets = Vec::new();
        let mut seen = BTreeSet::new();
        for (table_full, columns) in &self.targets {
            let (schema, table) = table_full
                .split_once('.')
                .filter(|(schema, table)| !schema.is_empty() && !table.is_empty())
                .ok_or_else(|| anyhow!("target {table_full:?} must look like schema.table"))?;
            if columns.is_empty() {
                bail!("target {table_full:?} lists no columns");
            }
            for column in columns {
                if !seen.insert((table, column.as_str())) {
                    bail!(
                        "column {table}.{column} is configured more than once; \
                         each table.column may be monitored under a single schema"
                    );
                }
                targets.push(MonitoredTarget::new(schema, table, column.as_str()));
            }
        }
        Ok(targets)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            warning_pct: self.drift.warning_threshold_pct,
            critical_pct: self.drift.critical_threshold_pct,
        }
    }

    pub fn baseline_window(&self) -> BaselineWindow {
        BaselineWindow {
            window_days: self.drift.baseline_window_days,
            tolerance_days: self.drift.baseline_tolerance_days,
        }
    }

    pub fn resolved_store_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn column_source(&self) -> SqliteColumnSource {
        let mut source = SqliteColumnSource::new(expand_tilde(&self.source.db_path))
            .with_busy_timeout(Duration::from_millis(self.source.busy_timeout_ms));
        for (schema, path) in &self.source.attach {
            source = source.attach(schema.as_str(), expand_tilde(path));
        }
        source
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"[source]
db_path = "~/.local/share/drift-monitor/source.db"
busy_timeout_ms = 5000

[source.attach]
olist_silver = "~/.local/share/drift-monitor/olist_silver.db"

[storage]
db_path = "~/.local/share/drift-monitor/monitoring.db"

[targets]
"olist_silver.orders" = ["price", "freight_value"]
"olist_silver.order_reviews" = ["review_score"]
"olist_silver.order_items" = ["item_total_value", "freight_value"]

[drift]
warning_threshold_pct = 20.0
critical_threshold_pct = 50.0
baseline_window_days = 7
baseline_tolerance_days = 1

[extraction]
max_parallel = 4

[alerts]
top_critical = 5
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            targets: default_targets(),
            drift: DriftConfig::default(),
            extraction: ExtractionConfig::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            db_path: default_source_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            attach: default_attach(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_store_db_path(),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            warning_threshold_pct: default_warning_threshold(),
            critical_threshold_pct: default_critical_threshold(),
            baseline_window_days: default_baseline_window_days(),
            baseline_tolerance_days: default_baseline_tolerance_days(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            top_critical: default_top_critical(),
        }
    }
}

fn default_source_db_path() -> String {
    "~/.local/share/drift-monitor/source.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_attach() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "olist_silver".to_string(),
        "~/.local/share/drift-monitor/olist_silver.db".to_string(),
    )])
}

fn default_store_db_path() -> String {
    "~/.local/share/drift-monitor/monitoring.db".to_string()
}

fn default_targets() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "olist_silver.orders".to_string(),
            vec!["price".to_string(), "freight_value".to_string()],
        ),
        (
            "olist_silver.order_reviews".to_string(),
            vec!["review_score".to_string()],
        ),
        (
            "olist_silver.order_items".to_string(),
            vec!["item_total_value".to_string(), "freight_value".to_string()],
        ),
    ])
}

fn default_warning_threshold() -> f64 {
    20.0
}

fn default_critical_threshold() -> f64 {
    50.0
}

fn default_baseline_window_days() -> u32 {
    7
}

fn default_baseline_tolerance_days() -> u32 {
    1
}

fn default_max_parallel() -> usize {
    4
}

fn default_top_critical() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{Config, ConfigOverrides};

    #[test]
    fn template_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.targets, defaults.targets);
        assert_eq!(parsed.thresholds(), defaults.thresholds());
        assert_eq!(parsed.baseline_window(), defaults.baseline_window());
        assert_eq!(parsed.source.attach, defaults.source.attach);
        assert_eq!(parsed.extraction.max_parallel, 4);
        assert_eq!(parsed.alerts.top_critical, 5);
        parsed.validate().unwrap();
    }

    #[test]
    fn expands_targets_per_column() {
        let targets = Config::default().monitored_targets().unwrap();
        assert_eq!(targets.len(), 5);
        assert!(targets.iter().all(|t| t.schema_name == "olist_silver"));
        assert!(targets
            .iter()
            .any(|t| t.table_name == "order_items" && t.column_name == "item_total_value"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[drift]
critical_threshold_pct = 75.0
"#,
        )
        .unwrap();
        assert_eq!(config.drift.warning_threshold_pct, 20.0);
        assert_eq!(config.drift.critical_threshold_pct, 75.0);
        assert_eq!(config.drift.baseline_window_days, 7);
        assert_eq!(config.targets.len(), 3);
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let mut config = Config::default();
        config.drift.warning_threshold_pct = 60.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drift.baseline_tolerance_days = 7;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .targets
            .insert("orders_without_schema".to_string(), vec!["price".to_string()]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.targets.insert("s.t".to_string(), Vec::new());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn same_table_column_under_two_schemas_is_rejected() {
        let config: Config = toml::from_str(
            r#"
[targets]
"silver.orders" = ["price"]
"gold.orders" = ["price"]
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("orders.price"));

        let config: Config = toml::from_str(
            r#"
[targets]
"silver.orders" = ["price", "price"]
"#,
        )
        .unwrap();
        assert!(config.monitored_targets().is_err());

        let config: Config = toml::from_str(
            r#"
[targets]
"silver.orders" = ["price"]
"gold.payments" = ["price"]
"#,
        )
        .unwrap();
        assert_eq!(config.monitored_targets().unwrap().len(), 2);
    }

    #[test]
    fn load_reads_file_and_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load(Some(&path)).unwrap().targets.len(), 3);

        Config::write_template(&path).unwrap();
        let mut config = Config::load(Some(&path)).unwrap();
        config.apply_overrides(ConfigOverrides {
            source_db: Some("/tmp/source.db".to_string()),
            store_db: None,
        });
        assert_eq!(config.source.db_path, "/tmp/source.db");
        assert!(config.storage.db_path.ends_with("monitoring.db"));
    }
}
