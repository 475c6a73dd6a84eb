//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and the `/metrics` exporter.
//!
//! Request tracing is `tower_http::trace::TraceLayer`, applied in
//! [`crate::app`].

pub mod metrics;
