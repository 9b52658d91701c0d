pub mod report;

pub use report::{build_report, format_event, DriftReport, ReportStatus, DEFAULT_TOP_CRITICAL};
