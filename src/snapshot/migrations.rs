pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS data_statistics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    metric_value REAL,
    row_count INTEGER NOT NULL,
    captured_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_statistics_run_metric
    ON data_statistics(table_name, column_name, metric_name, captured_at);
CREATE INDEX IF NOT EXISTS idx_statistics_captured
    ON data_statistics(captured_at DESC);
"#;
