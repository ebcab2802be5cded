//! Ambient logging/tracing setup (A2 in the expanded design): a tracing
//! stack scoped to what a CLI batch tool needs, with the metrics/health/OTLP
//! surface a long-running HTTP service would carry left out.

pub mod config;
pub mod tracing;

pub use config::{TracingConfig, TracingFormat};
pub use tracing::{init_tracing, CorrelationId, RequestId, TraceContext};
