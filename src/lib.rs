//! FPMA - Freight Price Movement Agent
//!
//! Ingests freight rate data from heterogeneous sources, normalizes and
//! validates it, and computes price-movement analytics (aggregates, trend
//! direction, time series, baseline comparisons) over arbitrary time
//! windows and filters.

pub mod analysis;
pub mod bucketer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod connectors;
pub mod domain;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod presenter;
pub mod rates;
pub mod resilience;
pub mod store;
pub mod validation;

pub use error::{ErrorCode, FpmaError, Result};

pub use domain::{
    AggregateStats, AnalysisFilters, AnalysisOptions, AnalysisRequest, AnalysisResult,
    AnalysisStatus, BaselineComparison, BucketRow, Comparison, DataQualityFlag, DataSourceConfig,
    FreightRecord, Granularity, IngestionJob, JobStatus, OutputFormat, SourceStatus, SourceType,
    TimePeriod, TransportMode, TrendDirection,
};

pub use resilience::{call_guarded, Breaker, BreakerRegistry, BreakerState, RetryPolicy};

pub use validation::{validate_config, validate_record, RawRecord};

pub use rates::{CachedRateProvider, RateProvider};

pub use connectors::{create_connector, ConnectorLifecycle, ConnectorState, DataSource};

pub use store::{InMemoryStore, SqliteStore, Store};

pub use cache::{fingerprint, ResultCache};

pub use analysis::AnalysisEngine;

pub use ingestion::IngestionPipeline;

pub use presenter::{DefaultRenderer, Renderer};

pub use config::AppConfig;

pub use observability::{init_tracing, CorrelationId, RequestId, TraceContext, TracingConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
