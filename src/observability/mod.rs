//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing spans and events for operators)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! Distinct from [`crate::logging`], which is the application-visible
//! request/response log pipeline with its own sinks and subscriptions.

pub mod logging;
pub mod metrics;
