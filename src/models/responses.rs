//! Response DTOs for the admin endpoints
//!
//! Defines the structure of the proxy's own HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::{MetricsSnapshot, TimerSnapshot};

/// Response body for the stats endpoint (GET /_cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cache hits across all paths
    pub hits: u64,
    /// Cache misses across all paths
    pub misses: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Every counter by name
    pub counters: BTreeMap<String, u64>,
    /// Every timer by name
    pub timers: BTreeMap<String, TimerSnapshot>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a metrics snapshot
    pub fn from_snapshot(snapshot: MetricsSnapshot) -> Self {
        Self {
            hits: snapshot.total_hits(),
            misses: snapshot.total_misses(),
            hit_rate: snapshot.hit_rate(),
            counters: snapshot.counters,
            timers: snapshot.timers,
        }
    }
}

/// Response body for the health endpoint (GET /_cache/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
