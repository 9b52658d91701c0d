use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::drift::{DriftEvent, Severity};
use crate::types::{RunResult, StatisticSnapshot};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.to_string());
    match severity {
        Severity::Ok => cell.fg(Color::Green),
        Severity::Warning => cell.fg(Color::Yellow),
        Severity::Critical => cell.fg(Color::Red),
    }
}

pub fn render_run_table(result: &RunResult) -> String {
    let mut table = new_table();
    table.set_header(vec!["Events", "OK", "Warning", "Critical"]);
    table.add_row(vec![
        result.drift_event_count.to_string(),
        result.ok.to_string(),
        result.warning.to_string(),
        result.critical.to_string(),
    ]);
    table.to_string()
}

pub fn render_events_table(events: &[DriftEvent]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Table", "Column", "Metric", "Baseline", "Current", "Drift", "Severity",
    ]);
    for event in events {
        table.add_row(Row::from(vec![
            Cell::new(&event.table_name),
            Cell::new(&event.column_name),
            Cell::new(event.metric_name.to_string()),
            Cell::new(format!("{:.2}", event.baseline_value)),
            Cell::new(format!("{:.2}", event.current_value)),
            Cell::new(format!("{:+.1}%", event.drift_pct)),
            severity_cell(event.severity),
        ]));
    }
    table.to_string()
}

pub fn render_snapshots_table(snapshots: &[StatisticSnapshot]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Captured At",
        "Table",
        "Column",
        "Metric",
        "Value",
        "Rows",
    ]);
    for snapshot in snapshots {
        table.add_row(vec![
            snapshot.captured_at.to_rfc3339(),
            snapshot.table_name.clone(),
            snapshot.column_name.clone(),
            snapshot.metric_name.to_string(),
            snapshot
                .metric_value
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "-".to_string()),
            snapshot.row_count.to_string(),
        ]);
    }
    table.to_string()
}
