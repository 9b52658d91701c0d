use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::error::SourceError;
use crate::source::ColumnSource;
use crate::types::MonitoredTarget;

const MAIN_SCHEMA: &str = "main";

/// Reads monitored columns out of SQLite databases.
///
/// `main` resolves to the primary database; every other schema must be
/// registered through [`SqliteColumnSource::attach`]. A connection is opened per
/// query, so the source can be shared by parallel extraction tasks.
#[derive(Debug, Clone)]
pub struct SqliteColumnSource {
    db_path: PathBuf,
    attached: BTreeMap<String, PathBuf>,
    busy_timeout: Duration,
}

impl SqliteColumnSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            attached: BTreeMap::new(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn attach(mut self, schema: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attached.insert(schema.into(), path.into());
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn connect(&self, schema: &str) -> Result<Connection, SourceError> {
        let conn = open_read_only(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        if schema != MAIN_SCHEMA {
            let path = self
                .attached
                .get(schema)
                .ok_or_else(|| SourceError::UnknownSchema(schema.to_string()))?;
            let sql = format!("ATTACH DATABASE ?1 AS {}", quote_identifier(schema)?);
            conn.execute(&sql, params![path.to_string_lossy().into_owned()])?;
        }
        Ok(conn)
    }
}

impl ColumnSource for SqliteColumnSource {
    fn fetch_values(&self, target: &MonitoredTarget) -> Result<Vec<f64>, SourceError> {
        let schema = quote_identifier(&target.schema_name)?;
        let table = quote_identifier(&target.table_name)?;
        let column = quote_identifier(&target.column_name)?;
        let conn = self.connect(&target.schema_name)?;

        // Text and blobs would otherwise cast to 0.0; only numeric storage counts.
        let sql = format!(
            "SELECT CAST({column} AS REAL) FROM {schema}.{table} \
             WHERE typeof({column}) IN ('integer', 'real')"
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, f64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(column = %target, rows = values.len(), "fetched column values");
        Ok(values)
    }
}

fn open_read_only(path: &Path) -> Result<Connection, SourceError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_with_flags(path, flags)?)
}

/// Accepts plain `[A-Za-z_][A-Za-z0-9_]*` names and double-quotes them.
pub fn quote_identifier(name: &str) -> Result<String, SourceError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SourceError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::{quote_identifier, SqliteColumnSource};
    use crate::error::SourceError;
    use crate::source::ColumnSource;
    use crate::types::MonitoredTarget;

    fn seed(dir: &TempDir, file: &str) -> std::path::PathBuf {
        let path = dir.path().join(file);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE orders (id INTEGER PRIMARY KEY, price REAL, freight_value REAL);
INSERT INTO orders (price, freight_value) VALUES (10.0, NULL), (20.0, 5.0), (NULL, 7.0), (30.0, 9.0);
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn reads_non_null_values_from_main() {
        let dir = TempDir::new().unwrap();
        let path = seed(&dir, "main.db");
        let source = SqliteColumnSource::new(&path);
        let mut values = source
            .fetch_values(&MonitoredTarget::new("main", "orders", "price"))
            .unwrap();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn reads_from_attached_schema() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("empty.db");
        Connection::open(&main)
            .unwrap()
            .execute_batch("CREATE TABLE placeholder (id INTEGER);")
            .unwrap();
        let silver = seed(&dir, "silver.db");
        let source = SqliteColumnSource::new(&main).attach("olist_silver", &silver);
        let agg = source
            .aggregate(&MonitoredTarget::new("olist_silver", "orders", "freight_value"))
            .unwrap();
        assert_eq!(agg.row_count, 3);
        assert_eq!(agg.min, Some(5.0));
        assert_eq!(agg.max, Some(9.0));
    }

    #[test]
    fn rejects_unknown_schema_and_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = seed(&dir, "main.db");
        let source = SqliteColumnSource::new(&path);
        let err = source
            .fetch_values(&MonitoredTarget::new("olist_gold", "orders", "price"))
            .unwrap_err();
        assert!(matches!(err, SourceError::UnknownSchema(_)));
        let err = source
            .fetch_values(&MonitoredTarget::new("main", "orders", "discount"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Query(_)));
    }

    #[test]
    fn skips_text_values_instead_of_reading_them_as_zero() {
        let dir = TempDir::new().unwrap();
        let path = seed(&dir, "main.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "INSERT INTO orders (price, freight_value) VALUES ('n/a', 1), ('12', 2), (X'00', 3);",
            )
            .unwrap();
        let source = SqliteColumnSource::new(&path);
        let agg = source
            .aggregate(&MonitoredTarget::new("main", "orders", "price"))
            .unwrap();
        assert_eq!(agg.row_count, 4);
        assert_eq!(agg.min, Some(10.0));
        assert_eq!(agg.max, Some(30.0));
    }

    #[test]
    fn quotes_only_plain_identifiers() {
        assert_eq!(quote_identifier("item_total_value").unwrap(), "\"item_total_value\"");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("1price").is_err());
        assert!(quote_identifier("price; DROP TABLE orders").is_err());
        assert!(quote_identifier("pri\"ce").is_err());
    }
}
