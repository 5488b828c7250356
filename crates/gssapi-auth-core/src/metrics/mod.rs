//! Metrics collection for the GSSAPI auth backend.
//!
//! Provides Prometheus-compatible metrics for login and renewal outcomes and
//! negotiation latency.

pub mod prometheus;

pub use prometheus::AuthMetrics;
