//! Metrics Reporter Task
//!
//! Background task that periodically logs cache and upstream metrics.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::metrics::MetricsRegistry;

/// Spawns a background task that logs a metrics snapshot every
/// `interval_secs` seconds.
///
/// Totals are logged at info; every individual counter and timer at debug.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let reporter = spawn_metrics_reporter(registry.clone(), 60);
/// // Later, during shutdown:
/// reporter.abort();
/// ```
pub fn spawn_metrics_reporter(registry: Arc<MetricsRegistry>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting metrics reporter with interval of {} seconds",
            interval.as_secs()
        );

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let snapshot = registry.snapshot();
            info!(
                hits = snapshot.total_hits(),
                misses = snapshot.total_misses(),
                hit_rate = snapshot.hit_rate(),
                "Cache metrics"
            );

            for (name, count) in &snapshot.counters {
                debug!(metric = %name, count, "counter");
            }
            for (name, timer) in &snapshot.timers {
                debug!(
                    metric = %name,
                    count = timer.count,
                    mean_us = timer.mean_us,
                    total_us = timer.total_us,
                    "timer"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_runs_until_aborted() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        registry.counter("nodes.cache.hit").inc();

        let handle = spawn_metrics_reporter(registry, 1);
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!handle.is_finished(), "Reporter should keep running");

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
