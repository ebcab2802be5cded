//! Analysis Engine time-bucketing, aggregation, and price-movement
//! math with deterministic decimal semantics.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::bucketer::{all_bucket_starts, group_by_bucket};
use crate::cache::{fingerprint, ResultCache};
use crate::domain::{
    AggregateStats, AnalysisFilters, AnalysisOptions, AnalysisRequest, AnalysisResult,
    AnalysisStatus, BaselineComparison, BucketRow, Comparison, FreightRecord, TimePeriod,
    TrendDirection,
};
use crate::error::{FpmaError, Result};
use crate::rates::RateProvider;
use crate::store::Store;

/// Internal computation precision (>= 4 decimals).
const INTERNAL_SCALE: u32 = 4;
/// Output precision for money and percentage figures.
const OUTPUT_SCALE: u32 = 2;
/// Trend-direction threshold, in percentage points.
const TREND_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 0);

pub struct AnalysisEngine {
    store: Arc<dyn Store>,
    rate_provider: Option<Arc<dyn RateProvider>>,
    cache: Arc<ResultCache>,
}

impl AnalysisEngine {
    pub fn new(store: Arc<dyn Store>, rate_provider: Option<Arc<dyn RateProvider>>, cache: Arc<ResultCache>) -> Self {
        Self {
            store,
            rate_provider,
            cache,
        }
    }

    /// Computes price-movement analytics for a request, caching the
    /// result. Steps are numbered in comments to keep the pipeline legible.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        // 1. Validate request.
        request.time_period.validate()?;
        if let Some(baseline) = &request.options.baseline_period {
            baseline.validate()?;
        }

        // 2. Fingerprint.
        let fp = fingerprint(&request);

        // 3. Consult cache.
        if let Some(cached) = self.cache.get(&fp).await {
            return Ok(cached);
        }

        // Single-flight the miss path: collapses concurrent identical misses.
        let store = self.store.clone();
        let rate_provider = self.rate_provider.clone();
        let cache = self.cache.clone();
        let fp_for_compute = fp.clone();

        self.cache
            .single_flight(&fp, move || {
                let store = store.clone();
                let rate_provider = rate_provider.clone();
                let cache = cache.clone();
                let fp = fp_for_compute.clone();
                async move {
                    let result = compute_analysis(&store, rate_provider.as_deref(), &request, &fp, false).await?;
                    cache
                        .put(
                            fp,
                            result.clone(),
                            request.time_period.start_date,
                            request.time_period.end_date,
                            None,
                        )
                        .await;
                    Ok(result)
                }
            })
            .await
    }

    /// Notifies the cache that new records were appended, so overlapping
    /// cached windows are conservatively evicted.
    pub async fn notify_appended(&self, min_date: chrono::DateTime<Utc>, max_date: chrono::DateTime<Utc>) {
        self.cache.invalidate_overlapping(min_date, max_date).await;
    }
}

async fn compute_analysis(
    store: &Arc<dyn Store>,
    rate_provider: Option<&dyn RateProvider>,
    request: &AnalysisRequest,
    fingerprint: &str,
    is_baseline: bool,
) -> Result<AnalysisResult> {
    let period = &request.time_period;

    // 4. Range scan, INVALID excluded unless explicitly requested.
    let mut records = store
        .range_scan(period.start_date, period.end_date, &request.filters, true)
        .await?;

    // 5. Currency normalization, batched by (from_ccy, date).
    if let Some(target_currency) = &request.target_currency {
        normalize_currency(&mut records, target_currency, rate_provider).await?;
    }

    // 6. Bucket records; fail if no non-empty bucket exists.
    let buckets = group_by_bucket(&records, period);
    if buckets.is_empty() {
        return Err(FpmaError::analysis("No data in window"));
    }

    // 7. Start/end bucket values.
    let start_bucket_key = *buckets
        .keys()
        .find(|k| **k >= period.start_date)
        .ok_or_else(|| FpmaError::analysis("No data in window"))?;
    let end_bucket_key = *buckets
        .keys()
        .rev()
        .find(|k| **k <= period.end_date)
        .ok_or_else(|| FpmaError::analysis("No data in window"))?;

    let start_bucket_records = &buckets[&start_bucket_key];
    let end_bucket_records = &buckets[&end_bucket_key];

    let start_value = mean_charge(start_bucket_records)?;
    let end_value = mean_charge(end_bucket_records)?;

    // 8. absolute_change / percentage_change with sentinel-null handling.
    let absolute_change = round_output(end_value - start_value);
    let percentage_change = percentage_change_of(start_value, end_value);

    // 9. trend_direction.
    let trend_direction = trend_direction_of(percentage_change, end_value);

    // 10. Aggregates.
    let start_period_stats = aggregate_of(start_bucket_records);
    let end_period_stats = aggregate_of(end_bucket_records);
    let overall_records: Vec<&FreightRecord> = buckets.values().flatten().copied().collect();
    let overall_stats = aggregate_of(&overall_records);

    // 11. Time series, including empty buckets.
    let time_series = if request.options.time_series {
        Some(build_time_series(period, &buckets))
    } else {
        None
    };

    // 12. Baseline comparison (no nesting).
    let baseline_comparison = if !is_baseline {
        match &request.options.baseline_period {
            Some(baseline_period) => {
                let baseline_request = AnalysisRequest {
                    time_period: baseline_period.clone(),
                    filters: request.filters.clone(),
                    options: AnalysisOptions {
                        baseline_period: None,
                        ..request.options.clone()
                    },
                    target_currency: request.target_currency.clone(),
                    output_format: request.output_format,
                };
                let baseline_result =
                    Box::pin(compute_analysis(store, rate_provider, &baseline_request, fingerprint, true)).await?;
                Some(baseline_comparison_of(percentage_change, baseline_result.percentage_change))
            }
            None => None,
        }
    } else {
        None
    };

    let currency_code = request
        .target_currency
        .clone()
        .unwrap_or_else(|| overall_records.first().map(|r| r.currency_code.clone()).unwrap_or_default());

    Ok(AnalysisResult {
        id: Uuid::new_v4(),
        request_fingerprint: fingerprint.to_string(),
        status: AnalysisStatus::Completed,
        start_value: round_output(start_value),
        end_value: round_output(end_value),
        absolute_change,
        percentage_change,
        trend_direction,
        start_period_stats,
        end_period_stats,
        overall_stats,
        time_series,
        baseline_comparison,
        currency_code,
        computed_at: Utc::now(),
    })
}

async fn normalize_currency(
    records: &mut [FreightRecord],
    target_currency: &str,
    rate_provider: Option<&dyn RateProvider>,
) -> Result<()> {
    let Some(provider) = rate_provider else {
        return Err(FpmaError::integration(
            "target_currency requested but no RateProvider is configured",
        ));
    };

    // Batch the distinct (from_ccy, date) pairs to minimize lookups.
    let mut rates: HashMap<(String, chrono::NaiveDate), Decimal> = HashMap::new();
    for record in records.iter() {
        let key = (record.currency_code.clone(), record.record_date.date_naive());
        if !rates.contains_key(&key) {
            let rate = provider
                .get_rate(&record.currency_code, target_currency, Some(key.1))
                .await
                .map_err(|_| FpmaError::integration(format!(
                    "failed to obtain FX rate {}->{} for {}",
                    record.currency_code, target_currency, key.1
                )))?;
            rates.insert(key, rate);
        }
    }

    for record in records.iter_mut() {
        let key = (record.currency_code.clone(), record.record_date.date_naive());
        let rate = rates[&key];
        record.freight_charge = round_internal(record.freight_charge * rate);
        record.currency_code = target_currency.to_string();
    }

    Ok(())
}

fn mean_charge(records: &[&FreightRecord]) -> Result<Decimal> {
    if records.is_empty() {
        return Err(FpmaError::analysis("No data in window"));
    }
    let sum: Decimal = records.iter().map(|r| r.freight_charge).sum();
    Ok(round_internal(sum / Decimal::from(records.len())))
}

fn aggregate_of(records: &[&FreightRecord]) -> AggregateStats {
    if records.is_empty() {
        return AggregateStats {
            avg: Decimal::ZERO,
            min: Decimal::ZERO,
            max: Decimal::ZERO,
            count: 0,
        };
    }
    let sum: Decimal = records.iter().map(|r| r.freight_charge).sum();
    let avg = round_internal(sum / Decimal::from(records.len()));
    let min = records.iter().map(|r| r.freight_charge).min().unwrap();
    let max = records.iter().map(|r| r.freight_charge).max().unwrap();
    AggregateStats {
        avg: round_output(avg),
        min: round_output(min),
        max: round_output(max),
        count: records.len() as u64,
    }
}

fn percentage_change_of(start_value: Decimal, end_value: Decimal) -> Option<Decimal> {
    if start_value == Decimal::ZERO {
        if end_value == Decimal::ZERO {
            Some(Decimal::ZERO)
        } else {
            None
        }
    } else {
        let change = round_internal((end_value - start_value) / start_value * Decimal::from(100));
        Some(round_output(change))
    }
}

fn trend_direction_of(percentage_change: Option<Decimal>, end_value: Decimal) -> TrendDirection {
    match percentage_change {
        Some(pct) => {
            if pct > TREND_THRESHOLD {
                TrendDirection::Increasing
            } else if pct < -TREND_THRESHOLD {
                TrendDirection::Decreasing
            } else {
                TrendDirection::Stable
            }
        }
        // Undefined percentage_change: trend follows the sign of end_value.
        None => {
            if end_value > Decimal::ZERO {
                TrendDirection::Increasing
            } else if end_value < Decimal::ZERO {
                TrendDirection::Decreasing
            } else {
                TrendDirection::Stable
            }
        }
    }
}

fn baseline_comparison_of(
    current_pct: Option<Decimal>,
    baseline_pct: Option<Decimal>,
) -> BaselineComparison {
    let current = current_pct.unwrap_or(Decimal::ZERO);
    let baseline = baseline_pct.unwrap_or(Decimal::ZERO);
    let absolute_difference = round_output(current - baseline);
    let percentage_difference = absolute_difference;
    let comparison = if current < baseline {
        Comparison::Better
    } else if current > baseline {
        Comparison::Worse
    } else {
        Comparison::Same
    };
    BaselineComparison {
        absolute_difference,
        percentage_difference,
        comparison,
    }
}

fn build_time_series(
    period: &TimePeriod,
    buckets: &std::collections::BTreeMap<chrono::DateTime<Utc>, Vec<&FreightRecord>>,
) -> Vec<BucketRow> {
    all_bucket_starts(period)
        .into_iter()
        .map(|start| match buckets.get(&start) {
            Some(records) if !records.is_empty() => {
                let stats = aggregate_of(records);
                BucketRow {
                    bucket_start: start,
                    avg: Some(stats.avg),
                    min: Some(stats.min),
                    max: Some(stats.max),
                    count: stats.count,
                }
            }
            _ => BucketRow {
                bucket_start: start,
                avg: None,
                min: None,
                max: None,
                count: 0,
            },
        })
        .collect()
}

fn round_internal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(INTERNAL_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn round_output(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(OUTPUT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataQualityFlag, Granularity, OutputFormat, TransportMode};
    use crate::store::InMemoryStore;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn dt(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(date: chrono::DateTime<Utc>, charge: Decimal, origin: &str, dest: &str) -> FreightRecord {
        FreightRecord {
            id: Uuid::new_v4(),
            record_date: date,
            origin: origin.to_string(),
            destination: dest.to_string(),
            carrier: "ACME".to_string(),
            transport_mode: TransportMode::Road,
            freight_charge: charge,
            currency_code: "USD".to_string(),
            source_system: "test".to_string(),
            data_quality_flag: DataQualityFlag::Valid,
            ingested_at: Utc::now(),
            is_deleted: false,
        }
    }

    fn request(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>, granularity: Granularity) -> AnalysisRequest {
        AnalysisRequest {
            time_period: TimePeriod::new(start, end, granularity),
            filters: AnalysisFilters::default(),
            options: AnalysisOptions::default(),
            target_currency: None,
            output_format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn scenario_1_simple_increase_weekly() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .append(vec![
                record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX"),
                record(dt(2023, 1, 9), dec!(1100), "NYC", "LAX"),
            ])
            .await
            .unwrap();

        let engine = AnalysisEngine::new(store, None, Arc::new(ResultCache::new()));
        let req = request(dt(2023, 1, 1), dt(2023, 1, 15), Granularity::Weekly);
        let result = engine.analyze(req).await.unwrap();

        assert_eq!(result.start_value, dec!(1000.00));
        assert_eq!(result.end_value, dec!(1100.00));
        assert_eq!(result.absolute_change, dec!(100.00));
        assert_eq!(result.percentage_change, Some(dec!(10.00)));
        assert_eq!(result.trend_direction, TrendDirection::Increasing);
    }

    #[tokio::test]
    async fn scenario_2_stable_trend() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .append(vec![
                record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX"),
                record(dt(2023, 1, 9), dec!(1005), "NYC", "LAX"),
            ])
            .await
            .unwrap();

        let engine = AnalysisEngine::new(store, None, Arc::new(ResultCache::new()));
        let req = request(dt(2023, 1, 1), dt(2023, 1, 15), Granularity::Weekly);
        let result = engine.analyze(req).await.unwrap();

        assert_eq!(result.percentage_change, Some(dec!(0.50)));
        assert_eq!(result.trend_direction, TrendDirection::Stable);
    }

    #[tokio::test]
    async fn scenario_3_decrease_with_aggregates() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .append(vec![
                record(dt(2023, 1, 2), dec!(1200), "NYC", "LAX"),
                record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX"),
                record(dt(2023, 1, 8), dec!(800), "NYC", "LAX"),
                record(dt(2023, 1, 8), dec!(900), "NYC", "LAX"),
            ])
            .await
            .unwrap();

        let engine = AnalysisEngine::new(store, None, Arc::new(ResultCache::new()));
        let req = request(dt(2023, 1, 1), dt(2023, 1, 15), Granularity::Weekly);
        let result = engine.analyze(req).await.unwrap();

        assert_eq!(result.start_value, dec!(1100.00));
        assert_eq!(result.end_value, dec!(850.00));
        assert_eq!(result.absolute_change, dec!(-250.00));
        assert_eq!(result.trend_direction, TrendDirection::Decreasing);
        assert_eq!(result.start_period_stats.avg, dec!(1100.00));
        assert_eq!(result.start_period_stats.min, dec!(1000.00));
        assert_eq!(result.start_period_stats.max, dec!(1200.00));
        assert_eq!(result.end_period_stats.avg, dec!(850.00));
    }

    #[tokio::test]
    async fn scenario_4_empty_window_fails_and_cache_untouched() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let cache = Arc::new(ResultCache::new());
        let engine = AnalysisEngine::new(store, None, cache.clone());
        let req = request(dt(2023, 1, 1), dt(2023, 1, 15), Granularity::Weekly);
        let fp = fingerprint(&req);
        let result = engine.analyze(req).await;
        assert!(result.is_err());
        assert!(cache.get(&fp).await.is_none());
    }

    #[tokio::test]
    async fn scenario_5_baseline_comparison() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .append(vec![
                // Current window: +10%.
                record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX"),
                record(dt(2023, 1, 9), dec!(1100), "NYC", "LAX"),
                // Baseline window: +25%.
                record(dt(2022, 1, 2), dec!(1000), "NYC", "LAX"),
                record(dt(2022, 1, 9), dec!(1250), "NYC", "LAX"),
            ])
            .await
            .unwrap();

        let engine = AnalysisEngine::new(store, None, Arc::new(ResultCache::new()));
        let mut req = request(dt(2023, 1, 1), dt(2023, 1, 15), Granularity::Weekly);
        req.options.baseline_period = Some(TimePeriod::new(
            dt(2022, 1, 1),
            dt(2022, 1, 15),
            Granularity::Weekly,
        ));
        let result = engine.analyze(req).await.unwrap();

        assert_eq!(result.percentage_change, Some(dec!(10.00)));
        let baseline = result.baseline_comparison.expect("baseline comparison present");
        assert_eq!(baseline.percentage_difference, dec!(-15.00));
        assert_eq!(baseline.comparison, Comparison::Better);
    }

    #[tokio::test]
    async fn scenario_6_csv_ingest_quality_flags_not_analyzed() {
        // Analysis excludes INVALID records by default; verified at the
        // Store boundary via `is_analyzable`.
        let valid = record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX");
        assert!(valid.is_analyzable());
        let mut invalid = record(dt(2023, 1, 2), dec!(1000), "NYC", "LAX");
        invalid.data_quality_flag = DataQualityFlag::Invalid {
            reason: "future date".to_string(),
        };
        assert!(!invalid.is_analyzable());
    }

    use proptest::prelude::*;

    proptest! {
        // percentage_change(start, end) and percentage_change(end, start)
        // are symmetric under the inverse-percentage relation, within a
        // 0.01% rounding tolerance.
        #[test]
        fn percentage_change_is_symmetric_under_inversion(
            start in 1i64..1_000_000,
            end in 1i64..1_000_000,
        ) {
            let start = Decimal::from(start);
            let end = Decimal::from(end);
            let forward = percentage_change_of(start, end).unwrap();
            let backward = percentage_change_of(end, start).unwrap();

            let predicted_forward = round_output(-backward / (Decimal::ONE + backward / Decimal::from(100)));
            let diff = (forward - predicted_forward).abs();
            prop_assert!(diff <= dec!(0.01));
        }

        // trend_direction is Stable exactly when |percentage_change| falls
        // at or below the stability threshold.
        #[test]
        fn trend_direction_matches_stability_threshold(pct in -50.0f64..50.0) {
            let pct_dec = Decimal::from_f64(pct).unwrap();
            let direction = trend_direction_of(Some(pct_dec), Decimal::ONE);
            let expected_stable = pct_dec.abs() <= TREND_THRESHOLD;
            prop_assert_eq!(direction == TrendDirection::Stable, expected_stable);
        }
    }
}
