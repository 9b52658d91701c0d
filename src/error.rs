use thiserror::Error;

use crate::types::MonitoredTarget;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("unknown schema {0:?}")]
    UnknownSchema(String),
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("no data registered for {0}")]
    MissingColumn(String),
}

#[derive(Debug, Error)]
#[error("failed extracting statistics for {target}: {source}")]
pub struct ExtractionError {
    pub target: MonitoredTarget,
    #[source]
    pub source: SourceError,
}

#[derive(Debug, Error)]
pub enum BaselineUnavailable {
    #[error("no snapshots captured inside the baseline window")]
    EmptyWindow,
    #[error("snapshot storage failed: {0}")]
    Storage(String),
}

/// Writing the current snapshot failed. Losing a run breaks future baselines,
/// so this one is propagated to the caller.
#[derive(Debug, Error)]
#[error("failed persisting {count} snapshots: {message}")]
pub struct PersistenceError {
    pub count: usize,
    pub message: String,
}
