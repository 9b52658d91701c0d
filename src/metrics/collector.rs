use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::ExtractionError;
use crate::source::ColumnSource;
use crate::types::{MonitoredTarget, StatisticSnapshot};

pub fn extract_target(
    source: &dyn ColumnSource,
    target: &MonitoredTarget,
    captured_at: DateTime<Utc>,
) -> Result<Vec<StatisticSnapshot>, ExtractionError> {
    let aggregate = source
        .aggregate(target)
        .map_err(|source| ExtractionError {
            target: target.clone(),
            source,
        })?;
    Ok(aggregate.to_snapshots(target, captured_at))
}

/// Captures every target in order on the calling thread. Failed or panicking
/// targets are logged and left out.
pub fn extract_snapshots(
    source: &dyn ColumnSource,
    targets: &[MonitoredTarget],
    captured_at: DateTime<Utc>,
) -> Vec<StatisticSnapshot> {
    let mut snapshots = Vec::new();
    for target in targets {
        info!(column = %target, "capturing statistics");
        let attempt =
            panic::catch_unwind(AssertUnwindSafe(|| extract_target(source, target, captured_at)));
        match attempt {
            Ok(Ok(rows)) => snapshots.extend(rows),
            Ok(Err(err)) => error!("{err}"),
            Err(_) => error!(column = %target, "extraction panicked"),
        }
    }
    info!(count = snapshots.len(), "captured statistics");
    snapshots
}

/// Same contract as [`extract_snapshots`], with every query on the blocking
/// pool and up to `max_parallel` targets in flight (at least one). Output keeps
/// the order of `targets`.
pub async fn extract_snapshots_concurrent(
    source: Arc<dyn ColumnSource>,
    targets: &[MonitoredTarget],
    captured_at: DateTime<Utc>,
    max_parallel: usize,
) -> Vec<StatisticSnapshot> {
    let permits = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();
    for (idx, target) in targets.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            info!(column = %target, "capturing statistics");
            let joined = tokio::task::spawn_blocking(move || {
                extract_target(source.as_ref(), &target, captured_at)
            })
            .await;
            (idx, joined)
        });
    }

    let mut by_target: Vec<Option<Vec<StatisticSnapshot>>> = vec![None; targets.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, Ok(Ok(rows)))) => by_target[idx] = Some(rows),
            Ok((_, Ok(Err(err)))) => error!("{err}"),
            Ok((idx, Err(join_err))) => {
                error!(column = %targets[idx], "extraction task aborted: {join_err}");
            }
            Err(join_err) => error!("extraction task aborted: {join_err}"),
        }
    }

    let snapshots = by_target
        .into_iter()
        .flatten()
        .flatten()
        .collect::<Vec<_>>();
    info!(count = snapshots.len(), "captured statistics");
    snapshots
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

    use chrono::Utc;

    use super::{extract_snapshots, extract_snapshots_concurrent};
    use crate::error::SourceError;
    use crate::source::{ColumnSource, MemorySource};
    use crate::types::{MetricName, MonitoredTarget};

    fn targets() -> Vec<MonitoredTarget> {
        vec![
            MonitoredTarget::new("olist_silver", "orders", "price"),
            MonitoredTarget::new("olist_silver", "orders", "missing"),
            MonitoredTarget::new("olist_silver", "order_items", "freight_value"),
        ]
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_column(targets()[0].clone(), vec![Some(10.0), Some(20.0), None])
            .with_column(targets()[2].clone(), vec![Some(1.0), Some(2.0), Some(3.0)])
    }

    struct PanickingSource;

    impl ColumnSource for PanickingSource {
        fn fetch_values(&self, target: &MonitoredTarget) -> Result<Vec<f64>, SourceError> {
            if target.column_name == "missing" {
                panic!("driver crashed");
            }
            Ok(vec![1.0, 2.0])
        }
    }

    #[test]
    fn failed_target_does_not_stop_the_others() {
        let rows = extract_snapshots(&source(), &targets(), Utc::now());
        assert_eq!(rows.len(), 2 * MetricName::ALL.len());
        assert!(rows.iter().all(|r| r.column_name != "missing"));
        let price_count = rows
            .iter()
            .find(|r| r.column_name == "price")
            .map(|r| r.row_count);
        assert_eq!(price_count, Some(2));
    }

    #[tokio::test]
    async fn concurrent_extraction_keeps_target_order() {
        let rows =
            extract_snapshots_concurrent(Arc::new(source()), &targets(), Utc::now(), 4).await;
        assert_eq!(rows.len(), 2 * MetricName::ALL.len());
        assert_eq!(rows[0].table_name, "orders");
        assert_eq!(rows[0].metric_name, MetricName::Min);
        assert_eq!(rows.last().map(|r| r.table_name.as_str()), Some("order_items"));
    }

    #[test]
    fn panicking_target_is_skipped_on_the_calling_thread() {
        let rows = extract_snapshots(&PanickingSource, &targets(), Utc::now());
        assert_eq!(rows.len(), 2 * MetricName::ALL.len());
        assert!(rows.iter().all(|r| r.column_name != "missing"));
    }

    #[tokio::test]
    async fn single_permit_extraction_contains_panics_and_keeps_order() {
        let rows =
            extract_snapshots_concurrent(Arc::new(PanickingSource), &targets(), Utc::now(), 1)
                .await;
        assert_eq!(rows.len(), 2 * MetricName::ALL.len());
        assert_eq!(rows[0].column_name, "price");
        assert_eq!(rows.last().map(|r| r.column_name.as_str()), Some("freight_value"));
    }

    #[tokio::test]
    async fn panicking_extraction_is_contained() {
        let rows =
            extract_snapshots_concurrent(Arc::new(PanickingSource), &targets(), Utc::now(), 2)
                .await;
        assert_eq!(rows.len(), 2 * MetricName::ALL.len());
        assert!(rows.iter().all(|r| r.column_name != "missing"));
    }
}
