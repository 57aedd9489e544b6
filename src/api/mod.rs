//! API Module
//!
//! Request handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /_cache/health` - Health check endpoint
//! - `GET /_cache/stats` - Hit/miss totals and per-path metrics
//! - `GET <any other path>` - Served through the cache
//! - `<any other method> <any other path>` - Invalidates, then forwards

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
