//! Metrics Module
//!
//! Counters and timers for cache lookups and upstream calls, kept in a
//! Prometheus registry.
//!
//! # Names
//! - `<pathKey>.cache.query` - cache lookup latency (timer)
//! - `<pathKey>.time` - upstream latency on a miss (timer)
//! - `<pathKey>.cache.hit` - hits (counter)
//! - `<pathKey>.cache.miss` - misses (counter)

mod recorder;
mod registry;

pub use recorder::MetricsRecorder;
pub use registry::{MetricsRegistry, MetricsSnapshot, Timer, TimerSnapshot, METRIC_LABEL};

pub const CACHE_HIT: &str = "cache.hit";
pub const CACHE_MISS: &str = "cache.miss";
pub const CACHE_QUERY: &str = "cache.query";
pub const UPSTREAM_TIME: &str = "time";
