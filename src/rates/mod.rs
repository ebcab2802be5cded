//! Rate Provider an opaque external FX lookup with caching.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::Result;

/// External currency-exchange lookup. Implementations are expected to call
/// out to a real FX service; this crate specifies only the contract.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn get_rate(&self, from_ccy: &str, to_ccy: &str, at_date: Option<NaiveDate>) -> Result<Decimal>;
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RateKey {
    from: String,
    to: String,
    at_date: Option<NaiveDate>,
}

struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// Decorator wrapping any `RateProvider` with a 24h TTL cache keyed by
/// `(from, to, date_or_latest)`, mirroring how `DatabasePool` hides
/// `SqlitePool`/`PostgresPool` behind one type. Same-currency pairs short
/// circuit to `1` without touching the inner provider or the cache.
pub struct CachedRateProvider {
    inner: Box<dyn RateProvider>,
    ttl: Duration,
    cache: Mutex<HashMap<RateKey, CachedRate>>,
}

impl CachedRateProvider {
    pub fn new(inner: Box<dyn RateProvider>) -> Self {
        Self::with_ttl(inner, Duration::from_secs(86_400))
    }

    pub fn with_ttl(inner: Box<dyn RateProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateProvider for CachedRateProvider {
    async fn get_rate(&self, from_ccy: &str, to_ccy: &str, at_date: Option<NaiveDate>) -> Result<Decimal> {
        if from_ccy.eq_ignore_ascii_case(to_ccy) {
            return Ok(Decimal::ONE);
        }

        let key = RateKey {
            from: from_ccy.to_ascii_uppercase(),
            to: to_ccy.to_ascii_uppercase(),
            at_date,
        };

        {
            let cache = self.cache.lock().expect("rate cache poisoned");
            if let Some(entry) = cache.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.rate);
                }
            }
        }

        let rate = self.inner.get_rate(from_ccy, to_ccy, at_date).await?;

        let mut cache = self.cache.lock().expect("rate cache poisoned");
        cache.insert(
            key,
            CachedRate {
                rate,
                fetched_at: Instant::now(),
            },
        );
        Ok(rate)
    }
}
