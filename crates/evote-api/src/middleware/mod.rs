//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and the shared [`ApiMetrics`]
//!   registry handle.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly.

pub mod metrics;

pub use metrics::ApiMetrics;
