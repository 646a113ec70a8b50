//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`.
//! - [`metrics`]: HTTP request counters and latency histograms.

pub mod metrics;
pub mod tracing_layer;
