//! Result Cache fingerprint -> analysis result with TTL and
//! single-flight recomputation collapsing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex as AsyncMutex, Notify};

use crate::domain::{AnalysisRequest, AnalysisResult, AnalysisStatus};

/// Computes the stable hex fingerprint of a request's canonical form:
/// sorted filter lists, canonical enum names (the domain enums already
/// serialize to their canonical `UPPERCASE` names), and the
/// `target_currency`. Two requests that would produce the same analysis
/// must hash identically.
pub fn fingerprint(request: &AnalysisRequest) -> String {
    let mut origin_ids = request.filters.origin_ids.clone();
    let mut destination_ids = request.filters.destination_ids.clone();
    let mut carrier_ids = request.filters.carrier_ids.clone();
    origin_ids.sort();
    destination_ids.sort();
    carrier_ids.sort();
    let mut transport_modes: Vec<String> = request
        .filters
        .transport_modes
        .iter()
        .map(|m| m.as_str().to_string())
        .collect();
    transport_modes.sort();

    let canonical = serde_json::json!({
        "start_date": request.time_period.start_date,
        "end_date": request.time_period.end_date,
        "granularity": format!("{:?}", request.time_period.granularity).to_uppercase(),
        "custom_interval_days": request.time_period.custom_interval_days,
        "origin_ids": origin_ids,
        "destination_ids": destination_ids,
        "carrier_ids": carrier_ids,
        "transport_modes": transport_modes,
        "target_currency": request.target_currency.as_deref().unwrap_or(""),
        "absolute_change": request.options.absolute_change,
        "percentage_change": request.options.percentage_change,
        "trend_direction": request.options.trend_direction,
        "compute_aggregates": request.options.compute_aggregates,
        "time_series": request.options.time_series,
    });

    // serde_json serializes map keys in insertion order by default but the
    // object above is built with a fixed key order, which is sufficient for
    // determinism within this crate (no external canonical-JSON dependency
    // is needed since we never merge externally-produced JSON here).
    let serialized = serde_json::to_string(&canonical).expect("canonical request is serializable");

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

struct CacheEntry {
    result: AnalysisResult,
    inserted_at: Instant,
    ttl: Duration,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// In-flight computation slot: holds a `Notify` other callers wait on, and
/// the eventual result once the leader finishes. Grounded on the
/// `Arc<Semaphore>`-bounded concurrency pattern in `DlqProcessor`, adapted
/// here to a one-slot-per-fingerprint wait group instead of a bounded pool.
struct InFlight {
    notify: Arc<Notify>,
    result: AsyncMutex<Option<AnalysisResult>>,
}

pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Fingerprint-keyed cache with TTL and single-flight collapsing of
/// concurrent identical misses.
pub struct ResultCache {
    entries: AsyncMutex<HashMap<String, CacheEntry>>,
    in_flight: AsyncMutex<HashMap<String, Arc<InFlight>>>,
    default_ttl: Duration,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_default_ttl(Duration::from_secs(DEFAULT_TTL_SECONDS))
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: AsyncMutex::new(HashMap::new()),
            in_flight: AsyncMutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Returns a COMPLETED cached result for `fingerprint`, if present and
    /// unexpired.
    pub async fn get(&self, fingerprint: &str) -> Option<AnalysisResult> {
        let mut entries = self.entries.lock().await;
        match entries.get(fingerprint) {
            Some(entry) if !entry.is_expired() && entry.result.status == AnalysisStatus::Completed => {
                Some(entry.result.clone())
            }
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    pub async fn put(
        &self,
        fingerprint: String,
        result: AnalysisResult,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        ttl: Option<Duration>,
    ) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            fingerprint,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
                window_start,
                window_end,
            },
        );
    }

    /// Runs `compute` under single-flight semantics for `fingerprint`: the
    /// first caller becomes the leader and actually invokes `compute`;
    /// concurrent callers with the same fingerprint wait for the leader and
    /// share its outcome. A failed computation is not cached and does not
    /// block subsequent callers.
    pub async fn single_flight<F, Fut>(
        &self,
        fingerprint: &str,
        compute: F,
    ) -> crate::error::Result<AnalysisResult>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::error::Result<AnalysisResult>>,
    {
        let (is_leader, slot) = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(fingerprint) {
                (false, existing.clone())
            } else {
                let slot = Arc::new(InFlight {
                    notify: Arc::new(Notify::new()),
                    result: AsyncMutex::new(None),
                });
                in_flight.insert(fingerprint.to_string(), slot.clone());
                (true, slot)
            }
        };

        if !is_leader {
            slot.notify.notified().await;
            let result = slot.result.lock().await;
            return match result.as_ref() {
                Some(value) => Ok(value.clone()),
                None => Err(crate::error::FpmaError::analysis(
                    "single-flight leader computation failed",
                )),
            };
        }

        let outcome = compute().await;

        {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.remove(fingerprint);
        }

        if let Ok(ref value) = outcome {
            let mut slot_result = slot.result.lock().await;
            *slot_result = Some(value.clone());
        }
        slot.notify.notify_waiters();

        outcome
    }

    /// Conservative overlap-eviction on append: evicts every cached entry
    /// whose window overlaps `[min_date, max_date]` of the appended batch.
    pub async fn invalidate_overlapping(&self, min_date: DateTime<Utc>, max_date: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !(entry.window_start <= max_date && entry.window_end >= min_date));
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
