use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::FreightRecord;
use crate::error::{FpmaError, Result};

use super::{record_matches, RangeScanFilters, Store};

/// In-memory `Store` for unit and scenario tests that don't want a
/// database: a `RwLock`-guarded map plus linear scans, no persistence.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<Uuid, FreightRecord>>,
    seen_by_source: RwLock<HashMap<(String, String), Uuid>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn append(&self, records: Vec<FreightRecord>) -> Result<()> {
        let mut store = self.records.write().expect("store poisoned");
        let mut seen = self.seen_by_source.write().expect("store poisoned");

        for record in records {
            let dedupe_key = (record.source_system.clone(), record.id.to_string());
            if let Some(existing_id) = seen.get(&dedupe_key) {
                store.insert(*existing_id, record);
            } else {
                seen.insert(dedupe_key, record.id);
                store.insert(record.id, record);
            }
        }
        Ok(())
    }

    async fn range_scan(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        filters: &RangeScanFilters,
        exclude_invalid: bool,
    ) -> Result<Vec<FreightRecord>> {
        let store = self.records.read().expect("store poisoned");
        let mut matches: Vec<FreightRecord> = store
            .values()
            .filter(|r| !r.is_deleted)
            .filter(|r| r.record_date >= start_date && r.record_date <= end_date)
            .filter(|r| !exclude_invalid || !r.data_quality_flag.is_invalid())
            .filter(|r| record_matches(r, filters))
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.record_date);
        Ok(matches)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<FreightRecord> {
        let store = self.records.read().expect("store poisoned");
        store
            .get(&id)
            .cloned()
            .ok_or_else(|| FpmaError::not_found(format!("record {id} not found")))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let mut store = self.records.write().expect("store poisoned");
        let record = store
            .get_mut(&id)
            .ok_or_else(|| FpmaError::not_found(format!("record {id} not found")))?;
        record.is_deleted = true;
        Ok(())
    }
}
