//! Core data model: the types every other module operates on.

pub mod analysis;
pub mod job;
pub mod period;
pub mod record;
pub mod source;

pub use analysis::{
    AggregateStats, AnalysisOptions, AnalysisRequest, AnalysisResult, AnalysisStatus,
    BaselineComparison, BucketRow, Comparison, TrendDirection,
};
pub use job::{IngestionJob, JobStatus};
pub use period::{Granularity, TimePeriod};
pub use record::{DataQualityFlag, FreightRecord, TransportMode};
pub use source::{DataSourceConfig, SourceStatus, SourceType};
