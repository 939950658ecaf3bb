//! Observability for the streaming SSR pipeline.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `MetricsCollector` / `RenderMetrics` - Per-render timing metrics

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export shared types from edge-core for convenience
pub use edge_core::{LogConfig, LogFormat, LogLevel, RequestId, TimingContext};
