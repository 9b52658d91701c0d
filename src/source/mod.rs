pub mod sqlite;

use std::collections::BTreeMap;

use crate::error::SourceError;
use crate::metrics::ColumnAggregate;
use crate::types::MonitoredTarget;

pub use sqlite::SqliteColumnSource;

/// Queryable data that exposes the numeric values of a monitored column.
///
/// Calls are blocking. Implementations must be shareable across the blocking
/// pool so targets can be extracted in parallel.
pub trait ColumnSource: Send + Sync {
    /// Non-null values of the column; nulls are filtered by the source.
    fn fetch_values(&self, target: &MonitoredTarget) -> Result<Vec<f64>, SourceError>;

    /// Sources able to aggregate server-side may override this.
    fn aggregate(&self, target: &MonitoredTarget) -> Result<ColumnAggregate, SourceError> {
        let values = self.fetch_values(target)?;
        Ok(ColumnAggregate::from_values(&values))
    }
}

/// Fixed column data held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    columns: BTreeMap<MonitoredTarget, Vec<Option<f64>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, target: MonitoredTarget, values: Vec<Option<f64>>) -> Self {
        self.insert(target, values);
        self
    }

    pub fn insert(&mut self, target: MonitoredTarget, values: Vec<Option<f64>>) {
        self.columns.insert(target, values);
    }
}

impl ColumnSource for MemorySource {
    fn fetch_values(&self, target: &MonitoredTarget) -> Result<Vec<f64>, SourceError> {
        let values = self
            .columns
            .get(target)
            .ok_or_else(|| SourceError::MissingColumn(target.to_string()))?;
        Ok(values.iter().flatten().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnSource, MemorySource};
    use crate::error::SourceError;
    use crate::types::MonitoredTarget;

    #[test]
    fn memory_source_drops_nulls() {
        let target = MonitoredTarget::new("s", "orders", "price");
        let source =
            MemorySource::new().with_column(target.clone(), vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(source.fetch_values(&target).unwrap(), vec![1.0, 3.0]);
        let agg = source.aggregate(&target).unwrap();
        assert_eq!(agg.row_count, 2);
        assert_eq!(agg.mean, Some(2.0));
    }

    #[test]
    fn memory_source_reports_unknown_columns() {
        let source = MemorySource::new();
        let err = source
            .fetch_values(&MonitoredTarget::new("s", "orders", "missing"))
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn(_)));
    }
}
