// Property-based tests over the public API: bucket membership (every
// record in a window maps to one of that window's enumerated buckets) and
// aggregate identity (bucket counts/averages reconcile with the overall
// stats computed over the same window).

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fpma::bucketer::{all_bucket_starts, bucket_start};
use fpma::domain::{
    AnalysisFilters, AnalysisOptions, AnalysisRequest, DataQualityFlag, FreightRecord,
    Granularity, OutputFormat, TimePeriod, TransportMode,
};
use fpma::store::{InMemoryStore, Store};
use fpma::{AnalysisEngine, ResultCache};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn day(offset: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(offset)
}

fn record(date: chrono::DateTime<Utc>, charge: &str) -> FreightRecord {
    FreightRecord {
        id: Uuid::new_v4(),
        record_date: date,
        origin: "NYC".to_string(),
        destination: "LAX".to_string(),
        carrier: "ACME".to_string(),
        transport_mode: TransportMode::Road,
        freight_charge: Decimal::from_str(charge).unwrap(),
        currency_code: "USD".to_string(),
        source_system: "proptest".to_string(),
        data_quality_flag: DataQualityFlag::Valid,
        ingested_at: Utc::now(),
        is_deleted: false,
    }
}

fn granularity_for(tag: u8) -> Granularity {
    match tag % 4 {
        0 => Granularity::Daily,
        1 => Granularity::Weekly,
        2 => Granularity::Monthly,
        _ => Granularity::Quarterly,
    }
}

proptest! {
    // A record's bucket_start is one of the period's enumerated bucket
    // starts whenever the record's date falls within the window.
    #[test]
    fn bucket_start_lands_in_enumerated_buckets_when_in_window(
        window_start in 0i64..60,
        window_len in 1i64..90,
        record_offset in -30i64..150,
        granularity_tag in 0u8..4,
    ) {
        let start = day(window_start);
        let end = day(window_start + window_len);
        let period = TimePeriod::new(start, end, granularity_for(granularity_tag));
        let record_date = day(window_start + record_offset);

        let in_window = record_date >= start && record_date <= end;
        let starts = all_bucket_starts(&period);
        let bucket = bucket_start(record_date, &period);

        if in_window {
            prop_assert!(starts.contains(&bucket));
        }
    }
}

#[tokio::test]
async fn bucket_counts_and_average_reconcile_with_overall_stats() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let charges = ["1000.00", "1100.00", "950.00", "1200.00", "1050.00"];
    let records: Vec<_> = charges
        .iter()
        .enumerate()
        .map(|(i, charge)| record(day(i as i64 * 2), charge))
        .collect();
    store.append(records.clone()).await.unwrap();

    let engine = AnalysisEngine::new(store, None, Arc::new(ResultCache::new()));
    let request = AnalysisRequest {
        time_period: TimePeriod::new(day(0), day(20), Granularity::Weekly),
        filters: AnalysisFilters::default(),
        options: AnalysisOptions {
            time_series: true,
            ..Default::default()
        },
        target_currency: None,
        output_format: OutputFormat::Json,
    };
    let result = engine.analyze(request).await.unwrap();

    let series = result.time_series.expect("time series requested");
    let bucket_count_sum: u64 = series.iter().map(|row| row.count).sum();
    assert_eq!(bucket_count_sum, result.overall_stats.count);

    let total_charge: Decimal = charges.iter().map(|c| Decimal::from_str(c).unwrap()).sum();
    let expected_avg = total_charge / Decimal::from(charges.len() as u64);
    // overall.avg is rounded to 2dp; compare at the same precision.
    assert_eq!(
        result.overall_stats.avg.round_dp(2),
        expected_avg.round_dp(2)
    );
}
