//! Metrics Recorder Module
//!
//! Path-scoped cache and upstream metrics.

use std::sync::Arc;

use prometheus::IntCounter;

use crate::cache::KeyDeriver;
use crate::metrics::{MetricsRegistry, Timer, CACHE_HIT, CACHE_MISS, CACHE_QUERY, UPSTREAM_TIME};

// == Metrics Recorder ==
/// Records hits, misses and latencies under names derived from the request
/// path, e.g. `nodes.foo.cache.hit` for `/nodes/foo`.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    registry: Arc<MetricsRegistry>,
    deriver: KeyDeriver,
}

impl MetricsRecorder {
    pub fn new(registry: Arc<MetricsRegistry>, deriver: KeyDeriver) -> Self {
        Self { registry, deriver }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    fn counter(&self, path: &str, suffix: &str) -> IntCounter {
        self.registry.counter(&self.deriver.metric_name(path, suffix))
    }

    pub fn record_hit(&self, path: &str) {
        self.counter(path, CACHE_HIT).inc();
    }

    pub fn record_miss(&self, path: &str) {
        self.counter(path, CACHE_MISS).inc();
    }

    /// Timer for cache lookups on `path`.
    pub fn query_timer(&self, path: &str) -> Timer {
        self.registry.timer(&self.deriver.metric_name(path, CACHE_QUERY))
    }

    /// Timer for upstream round trips made on a miss for `path`.
    pub fn upstream_timer(&self, path: &str) -> Timer {
        self.registry.timer(&self.deriver.metric_name(path, UPSTREAM_TIME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recorder() -> MetricsRecorder {
        MetricsRecorder::new(
            Arc::new(MetricsRegistry::new().unwrap()),
            KeyDeriver::default(),
        )
    }

    #[test]
    fn test_names_follow_path() {
        let recorder = recorder();
        recorder.record_hit("/nodes/foo");
        recorder.record_miss("/nodes/foo");
        recorder.record_miss("/nodes/foo");
        recorder.query_timer("/nodes/foo").observe(Duration::from_micros(5));
        recorder.upstream_timer("/nodes/foo").observe(Duration::from_micros(50));

        let snap = recorder.registry().snapshot();
        assert_eq!(snap.counters["nodes.foo.cache.hit"], 1);
        assert_eq!(snap.counters["nodes.foo.cache.miss"], 2);
        assert_eq!(snap.timers["nodes.foo.cache.query"].count, 1);
        assert_eq!(snap.timers["nodes.foo.time"].total_us, 50);
    }

    #[test]
    fn test_clones_share_registry() {
        let recorder = recorder();
        let other = recorder.clone();
        recorder.record_hit("/roles");
        other.record_hit("roles");

        assert_eq!(recorder.registry().snapshot().counters["roles.cache.hit"], 2);
    }
}
