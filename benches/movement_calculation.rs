// Performance benchmarks for bucketing and price-movement computation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fpma::{FreightRecord, Granularity, TimePeriod, TransportMode};
use fpma::store::{InMemoryStore, Store};
use fpma::{AnalysisEngine, AnalysisFilters, AnalysisOptions, AnalysisRequest, OutputFormat, ResultCache};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

fn make_record(days_offset: i64, charge: &str) -> FreightRecord {
    let now = chrono::Utc::now();
    FreightRecord {
        id: Uuid::new_v4(),
        record_date: now - chrono::Duration::days(days_offset),
        origin: "LAX".to_string(),
        destination: "NYC".to_string(),
        carrier: "ACME".to_string(),
        transport_mode: TransportMode::Road,
        freight_charge: Decimal::from_str(charge).unwrap(),
        currency_code: "USD".to_string(),
        source_system: "bench".to_string(),
        data_quality_flag: fpma::domain::DataQualityFlag::Valid,
        ingested_at: now,
        is_deleted: false,
    }
}

fn bench_bucket_start(c: &mut Criterion) {
    let period = TimePeriod::new(
        chrono::Utc::now() - chrono::Duration::days(90),
        chrono::Utc::now(),
        Granularity::Weekly,
    );
    let record = make_record(10, "1500.00");

    c.bench_function("bucket_start_weekly", |b| {
        b.iter(|| {
            let result = fpma::bucketer::bucket_start(black_box(record.record_date), black_box(&period));
            black_box(result)
        })
    });
}

fn bench_group_by_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_by_bucket");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        let period = TimePeriod::new(
            chrono::Utc::now() - chrono::Duration::days(365),
            chrono::Utc::now(),
            Granularity::Monthly,
        );
        let records: Vec<_> = (0..*size)
            .map(|i| make_record(i as i64 % 365, "1000.00"))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let result = fpma::bucketer::group_by_bucket(black_box(&records), black_box(&period));
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("analyze_end_to_end");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let records: Vec<_> = (0..*size)
            .map(|i| make_record(i as i64 % 180, "1000.00"))
            .collect();
        rt.block_on(store.append(records)).unwrap();

        let cache = Arc::new(ResultCache::new());
        let engine = AnalysisEngine::new(store.clone(), None, cache);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.to_async(&rt).iter(|| async {
                // time_period carries the current instant, so each
                // iteration's fingerprint differs and the compute path
                // runs instead of hitting the shared cache.
                let request = AnalysisRequest {
                    time_period: TimePeriod::new(
                        chrono::Utc::now() - chrono::Duration::days(180),
                        chrono::Utc::now(),
                        Granularity::Weekly,
                    ),
                    filters: AnalysisFilters::default(),
                    options: AnalysisOptions {
                        time_series: true,
                        ..Default::default()
                    },
                    target_currency: None,
                    output_format: OutputFormat::Json,
                };
                let result = engine.analyze(black_box(request)).await;
                black_box(result)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bucket_start,
    bench_group_by_bucket,
    bench_full_analysis,
);
criterion_main!(benches);
