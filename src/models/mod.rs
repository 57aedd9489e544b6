//! Response models for the proxy's admin endpoints
//!
//! Proxied traffic is relayed verbatim; only `/_cache/*` routes produce
//! bodies of their own.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, StatsResponse};
