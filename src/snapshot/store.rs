use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use tracing::info;

use crate::snapshot::migrations::BASE_MIGRATION;
use crate::snapshot::SnapshotRepository;
use crate::types::{MetricName, StatisticSnapshot};

/// SQLite-backed snapshot history. The connection is guarded so the store can
/// be shared with blocking tasks.
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening snapshot store: {}", path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("snapshot store connection lock poisoned"))
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn()?.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    /// Most recent rows for one column, optionally narrowed to a metric.
    pub fn history(
        &self,
        table_name: &str,
        column_name: &str,
        metric: Option<MetricName>,
        limit: usize,
    ) -> Result<Vec<StatisticSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
SELECT table_name, column_name, metric_name, metric_value, row_count, captured_at
FROM data_statistics
WHERE table_name = ?1 AND column_name = ?2 AND (?3 IS NULL OR metric_name = ?3)
ORDER BY captured_at DESC, id DESC
LIMIT ?4
"#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    table_name,
                    column_name,
                    metric.map(|m| m.as_str()),
                    limit as i64
                ],
                row_to_snapshot,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn().unwrap()
    }
}

impl SnapshotRepository for SnapshotStore {
    fn save(&self, snapshots: &[StatisticSnapshot], captured_at: DateTime<Utc>) -> Result<usize> {
        if snapshots.is_empty() {
            info!("no statistics to save");
            return Ok(0);
        }

        let stamp = format_timestamp(captured_at);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare_cached(
                r#"
INSERT OR IGNORE INTO data_statistics(
    table_name, column_name, metric_name, metric_value, row_count, captured_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
            )?;
            for snapshot in snapshots {
                inserted += stmt.execute(params![
                    snapshot.table_name,
                    snapshot.column_name,
                    snapshot.metric_name.as_str(),
                    snapshot.metric_value,
                    snapshot.row_count as i64,
                    stamp
                ])?;
            }
        }
        tx.commit()?;
        info!(inserted, captured_at = %stamp, "saved statistics");
        Ok(inserted)
    }

    fn snapshots_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatisticSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
SELECT table_name, column_name, metric_name, metric_value, row_count, captured_at
FROM data_statistics
WHERE captured_at >= ?1 AND captured_at <= ?2
ORDER BY captured_at DESC, id DESC
"#,
        )?;
        let rows = stmt
            .query_map(
                params![format_timestamp(from), format_timestamp(to)],
                row_to_snapshot,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Fixed-width UTC text so lexical order matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<StatisticSnapshot> {
    let metric_raw: String = row.get(2)?;
    let metric_name = metric_raw
        .parse::<MetricName>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let captured_at_raw: String = row.get(5)?;
    let captured_at = DateTime::parse_from_rfc3339(&captured_at_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(StatisticSnapshot {
        table_name: row.get(0)?,
        column_name: row.get(1)?,
        metric_name,
        metric_value: row.get(3)?,
        row_count: row.get::<_, i64>(4)?.max(0) as u64,
        captured_at,
    })
}
