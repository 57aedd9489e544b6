//! Cache Proxy - a caching reverse proxy for a configuration-management API
//!
//! Serves repeated reads from a shared cache keyed by request path and clears
//! the matching entry before forwarding writes.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod proxy;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use tasks::spawn_metrics_reporter;
