//! Time Bucketer assigns records to daily/weekly/monthly/quarterly/
//! custom buckets and preserves empty buckets across a window.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};

use crate::domain::{FreightRecord, Granularity, TimePeriod};

/// Bucket boundary for `record_date`.
pub fn bucket_start(record_date: DateTime<Utc>, period: &TimePeriod) -> DateTime<Utc> {
    match period.granularity {
        Granularity::Daily => midnight(record_date),
        Granularity::Weekly => {
            let midnight = midnight(record_date);
            let days_since_monday = midnight.weekday().num_days_from_monday();
            midnight - Duration::days(days_since_monday as i64)
        }
        Granularity::Monthly => Utc
            .with_ymd_and_hms(record_date.year(), record_date.month(), 1, 0, 0, 0)
            .unwrap(),
        Granularity::Quarterly => {
            let quarter_start_month = ((record_date.month() - 1) / 3) * 3 + 1;
            Utc.with_ymd_and_hms(record_date.year(), quarter_start_month, 1, 0, 0, 0)
                .unwrap()
        }
        Granularity::Custom => {
            let interval_days = period.custom_interval_days.unwrap_or(1) as i64;
            let epoch = epoch_anchor();
            let elapsed_days = (midnight(record_date) - epoch).num_days();
            let bucket_index = elapsed_days.div_euclid(interval_days);
            epoch + Duration::days(bucket_index * interval_days)
        }
    }
}

/// Fixed epoch anchor for CUSTOM granularity.
fn epoch_anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()
}

fn midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(instant.year(), instant.month(), instant.day(), 0, 0, 0)
        .unwrap()
}

/// Next bucket boundary after `start`, for enumerating the full set of
/// bucket starts between two dates (used to emit empty buckets).
fn next_bucket_start(start: DateTime<Utc>, period: &TimePeriod) -> DateTime<Utc> {
    match period.granularity {
        Granularity::Daily => start + Duration::days(1),
        Granularity::Weekly => start + Duration::days(7),
        Granularity::Monthly => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
        }
        Granularity::Quarterly => {
            let (year, month) = if start.month() >= 10 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 3)
            };
            Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
        }
        Granularity::Custom => {
            let interval_days = period.custom_interval_days.unwrap_or(1) as i64;
            start + Duration::days(interval_days)
        }
    }
}

/// All bucket start instants covering `[period.start_date, period.end_date]`,
/// in ascending order, including buckets with no records so empty buckets
/// survive into a time series.
pub fn all_bucket_starts(period: &TimePeriod) -> Vec<DateTime<Utc>> {
    let mut starts = Vec::new();
    let mut cursor = bucket_start(period.start_date, period);
    while cursor <= period.end_date {
        starts.push(cursor);
        cursor = next_bucket_start(cursor, period);
    }
    starts
}

/// Groups records by bucket start. Only called with records already known
/// to fall within `period`; bucketing itself performs no I/O.
pub fn group_by_bucket<'a>(
    records: &'a [FreightRecord],
    period: &TimePeriod,
) -> std::collections::BTreeMap<DateTime<Utc>, Vec<&'a FreightRecord>> {
    let mut buckets: std::collections::BTreeMap<DateTime<Utc>, Vec<&FreightRecord>> =
        std::collections::BTreeMap::new();
    for record in records {
        let start = bucket_start(record.record_date, period);
        buckets.entry(start).or_default().push(record);
    }
    buckets
}
