//! Normalized Record Store append-only time-series of freight
//! records with filtered range scans.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AnalysisFilters, FreightRecord};
use crate::error::Result;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Filters a range scan accepts, re-exported here so the Store trait doesn't
/// need to depend on the analysis module directly.
pub type RangeScanFilters = AnalysisFilters;

#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotent per `(source_system, record_id)` when the connector
    /// supplies stable IDs; otherwise new IDs are assigned by the caller
    /// before append.
    async fn append(&self, records: Vec<FreightRecord>) -> Result<()>;

    /// Ordered by `record_date` ascending. Same-`record_date` records may
    /// appear in any stable order.
    async fn range_scan(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        filters: &RangeScanFilters,
        exclude_invalid: bool,
    ) -> Result<Vec<FreightRecord>>;

    async fn get_by_id(&self, id: Uuid) -> Result<FreightRecord>;

    async fn soft_delete(&self, id: Uuid) -> Result<()>;
}

pub(crate) fn record_matches(record: &FreightRecord, filters: &RangeScanFilters) -> bool {
    if !filters.origin_ids.is_empty() && !filters.origin_ids.contains(&record.origin) {
        return false;
    }
    if !filters.destination_ids.is_empty() && !filters.destination_ids.contains(&record.destination) {
        return false;
    }
    if !filters.carrier_ids.is_empty() && !filters.carrier_ids.contains(&record.carrier) {
        return false;
    }
    if !filters.transport_modes.is_empty() && !filters.transport_modes.contains(&record.transport_mode) {
        return false;
    }
    true
}
