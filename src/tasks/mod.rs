//! Background Tasks Module
//!
//! Contains background tasks that run periodically during proxy operation.
//!
//! # Tasks
//! - Metrics reporter: Logs a metrics snapshot at the configured interval

mod reporter;

pub use reporter::spawn_metrics_reporter;
