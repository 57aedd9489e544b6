//! Metrics Registry Module
//!
//! Named counters and timers backed by a Prometheus registry. Each name is a
//! label value on one counter family and one histogram family, registered on
//! first use and shared by every request that records under it.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use prometheus::proto::MetricType;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use serde::Serialize;

use crate::metrics::{CACHE_HIT, CACHE_MISS};

/// Label carrying the dotted metric name, e.g. `nodes.foo.cache.hit`.
pub const METRIC_LABEL: &str = "metric";

const COUNTER_FAMILY: &str = "cache_proxy_events_total";
const TIMER_FAMILY: &str = "cache_proxy_duration_seconds";

// == Timer ==
/// Latency histogram for one metric name.
#[derive(Clone)]
pub struct Timer {
    histogram: Histogram,
}

impl Timer {
    /// Records one observation.
    pub fn observe(&self, elapsed: Duration) {
        self.histogram.observe(elapsed.as_secs_f64());
    }

    /// Awaits `fut` and records how long it took.
    ///
    /// Nothing is recorded if the future is dropped before completing.
    pub async fn time<F: Future>(&self, fut: F) -> F::Output {
        let start = Instant::now();
        let output = fut.await;
        self.observe(start.elapsed());
        output
    }

    pub fn count(&self) -> u64 {
        self.histogram.get_sample_count()
    }
}

/// Point-in-time view of a [`Timer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total_us: u64,
    pub mean_us: f64,
}

impl TimerSnapshot {
    fn new(count: u64, sum_secs: f64) -> Self {
        let total_us = (sum_secs * 1_000_000.0).round() as u64;
        Self {
            count,
            total_us,
            mean_us: if count == 0 {
                0.0
            } else {
                total_us as f64 / count as f64
            },
        }
    }
}

// == Registry ==
/// Get-or-register store of named metrics.
///
/// Names are never removed, so one series exists per distinct request path
/// seen since startup.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    counters: IntCounterVec,
    timers: HistogramVec,
}

impl MetricsRegistry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let counters = IntCounterVec::new(
            Opts::new(COUNTER_FAMILY, "Cache hits and misses by metric name"),
            &[METRIC_LABEL],
        )?;
        registry.register(Box::new(counters.clone()))?;

        let timers = HistogramVec::new(
            HistogramOpts::new(TIMER_FAMILY, "Cache lookup and upstream latency by metric name"),
            &[METRIC_LABEL],
        )?;
        registry.register(Box::new(timers.clone()))?;

        Ok(Self {
            registry,
            counters,
            timers,
        })
    }

    /// Returns the counter registered under `name`, creating it if needed.
    pub fn counter(&self, name: &str) -> IntCounter {
        self.counters.with_label_values(&[name])
    }

    /// Returns the timer registered under `name`, creating it if needed.
    pub fn timer(&self, name: &str) -> Timer {
        Timer {
            histogram: self.timers.with_label_values(&[name]),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::default();

        for family in self.registry.gather() {
            for metric in family.get_metric() {
                let Some(name) = metric
                    .get_label()
                    .iter()
                    .find(|pair| pair.get_name() == METRIC_LABEL)
                    .map(|pair| pair.get_value().to_string())
                else {
                    continue;
                };

                match family.get_field_type() {
                    MetricType::COUNTER => {
                        snapshot
                            .counters
                            .insert(name, metric.get_counter().get_value() as u64);
                    }
                    MetricType::HISTOGRAM => {
                        let histogram = metric.get_histogram();
                        snapshot.timers.insert(
                            name,
                            TimerSnapshot::new(
                                histogram.get_sample_count(),
                                histogram.get_sample_sum(),
                            ),
                        );
                    }
                    _ => {}
                }
            }
        }

        snapshot
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn export(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

// == Snapshot ==
/// Every registered metric, ordered by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub timers: BTreeMap<String, TimerSnapshot>,
}

impl MetricsSnapshot {
    fn sum_suffix(&self, suffix: &str) -> u64 {
        self.counters
            .iter()
            .filter(|(name, _)| name.ends_with(suffix))
            .map(|(_, count)| count)
            .sum()
    }

    /// Cache hits across all paths.
    pub fn total_hits(&self) -> u64 {
        self.sum_suffix(CACHE_HIT)
    }

    /// Cache misses across all paths.
    pub fn total_misses(&self) -> u64 {
        self.sum_suffix(CACHE_MISS)
    }

    /// Returns hits / (hits + misses), or 0.0 if nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.total_hits();
        let total = hits + self.total_misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counter_registered_once() {
        let registry = MetricsRegistry::new().unwrap();
        registry.counter("nodes.cache.hit").inc();
        registry.counter("nodes.cache.hit").inc_by(2);

        assert_eq!(registry.counter("nodes.cache.hit").get(), 3);
        assert_eq!(registry.snapshot().counters.len(), 1);
    }

    #[test]
    fn test_timer_aggregates() {
        let registry = MetricsRegistry::new().unwrap();
        let timer = registry.timer("nodes.time");
        timer.observe(Duration::from_micros(100));
        timer.observe(Duration::from_micros(300));

        let snapshot = registry.snapshot();
        let snap = &snapshot.timers["nodes.time"];
        assert_eq!(snap.count, 2);
        assert_eq!(snap.total_us, 400);
        assert_eq!(snap.mean_us, 200.0);
    }

    #[test]
    fn test_unobserved_timer_snapshot() {
        let registry = MetricsRegistry::new().unwrap();
        registry.timer("nodes.time");
        assert_eq!(registry.snapshot().timers["nodes.time"], TimerSnapshot::default());
    }

    #[tokio::test]
    async fn test_timer_time_records_and_returns() {
        let registry = MetricsRegistry::new().unwrap();
        let timer = registry.timer("nodes.cache.query");
        let value = timer.time(async { 42 }).await;

        assert_eq!(value, 42);
        assert_eq!(timer.count(), 1);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let registry = MetricsRegistry::new().unwrap();
        assert_eq!(registry.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let registry = MetricsRegistry::new().unwrap();
        registry.counter("nodes.foo.cache.hit").inc_by(3);
        registry.counter("roles.web.cache.hit").inc();
        registry.counter("nodes.foo.cache.miss").inc_by(4);

        let snap = registry.snapshot();
        assert_eq!(snap.total_hits(), 4);
        assert_eq!(snap.total_misses(), 4);
        assert_eq!(snap.hit_rate(), 0.5);
    }

    #[test]
    fn test_export_text_format() {
        let registry = MetricsRegistry::new().unwrap();
        registry.counter("nodes.foo.cache.hit").inc();
        registry.timer("nodes.foo.time").observe(Duration::from_millis(2));

        let text = registry.export().unwrap();
        assert!(text.contains(r#"cache_proxy_events_total{metric="nodes.foo.cache.hit"} 1"#));
        assert!(text.contains(r#"cache_proxy_duration_seconds_count{metric="nodes.foo.time"} 1"#));
    }

    #[test]
    fn test_concurrent_increments() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        registry.counter("nodes.cache.miss").inc();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.counter("nodes.cache.miss").get(), 8000);
    }
}
