use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::TimePeriod;

/// Which optional computations an `AnalysisRequest` asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default = "default_true")]
    pub absolute_change: bool,
    #[serde(default = "default_true")]
    pub percentage_change: bool,
    #[serde(default = "default_true")]
    pub trend_direction: bool,
    #[serde(default = "default_true")]
    pub compute_aggregates: bool,
    #[serde(default)]
    pub time_series: bool,
    #[serde(default)]
    pub baseline_period: Option<TimePeriod>,
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            absolute_change: true,
            percentage_change: true,
            trend_direction: true,
            compute_aggregates: true,
            time_series: false,
            baseline_period: None,
        }
    }
}

/// Optional filters narrowing which records participate in an analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisFilters {
    #[serde(default)]
    pub origin_ids: Vec<String>,
    #[serde(default)]
    pub destination_ids: Vec<String>,
    #[serde(default)]
    pub carrier_ids: Vec<String>,
    #[serde(default)]
    pub transport_modes: Vec<super::record::TransportMode>,
}

/// Output rendering requested by the caller; consumed by the Presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Json,
    Csv,
    Text,
}

/// A request to compute freight price-movement analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub time_period: TimePeriod,
    #[serde(default)]
    pub filters: AnalysisFilters,
    #[serde(default)]
    pub options: AnalysisOptions,
    pub target_currency: Option<String>,
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Json
}

/// Lifecycle state of an `AnalysisResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Direction freight cost is trending, per the ±1% threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// `{avg, min, max}` or `{avg, min, max, count}` stats over a set of charges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregateStats {
    pub avg: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub count: u64,
}

/// One row of a requested time series: a bucket with its stats, or an empty
/// zero-count bucket preserved inside the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRow {
    pub bucket_start: DateTime<Utc>,
    pub avg: Option<Decimal>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub count: u64,
}

/// Favorable/unfavorable/no-change verdict of a baseline comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Better,
    Worse,
    Same,
}

/// Result of comparing the primary analysis window against a baseline
/// window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub absolute_difference: Decimal,
    pub percentage_difference: Decimal,
    pub comparison: Comparison,
}

/// The computed value object, owned by the Result Cache once `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub request_fingerprint: String,
    pub status: AnalysisStatus,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub absolute_change: Decimal,
    /// `None` represents the undefined case: `start_value = 0` while
    /// `end_value != 0`, where a percentage change has no finite value.
    pub percentage_change: Option<Decimal>,
    pub trend_direction: TrendDirection,
    pub start_period_stats: AggregateStats,
    pub end_period_stats: AggregateStats,
    pub overall_stats: AggregateStats,
    pub time_series: Option<Vec<BucketRow>>,
    pub baseline_comparison: Option<BaselineComparison>,
    pub currency_code: String,
    pub computed_at: DateTime<Utc>,
}
