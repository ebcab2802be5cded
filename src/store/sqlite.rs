use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::{DataQualityFlag, FreightRecord, TransportMode};
use crate::error::{FpmaError, Result};

use super::{record_matches, RangeScanFilters, Store};

/// Row shape persisted to SQLite, grounded on `storage::models`'s
/// string-typed `FromRow` row structs (the domain type carries richer types;
/// the row is the wire format SQLx actually understands).
#[derive(FromRow)]
struct FreightRecordRow {
    id: String,
    record_date: DateTime<Utc>,
    origin: String,
    destination: String,
    carrier: String,
    transport_mode: String,
    freight_charge: String,
    currency_code: String,
    source_system: String,
    quality_status: String,
    quality_reason: Option<String>,
    ingested_at: DateTime<Utc>,
    is_deleted: bool,
}

impl TryFrom<FreightRecordRow> for FreightRecord {
    type Error = FpmaError;

    fn try_from(row: FreightRecordRow) -> Result<Self> {
        let transport_mode = TransportMode::parse(&row.transport_mode)
            .ok_or_else(|| FpmaError::data_source("corrupt transport_mode in store"))?;
        let freight_charge: Decimal = row
            .freight_charge
            .parse()
            .map_err(|_| FpmaError::data_source("corrupt freight_charge in store"))?;
        let data_quality_flag = match row.quality_status.as_str() {
            "VALID" => DataQualityFlag::Valid,
            "WARNING" => DataQualityFlag::Warning {
                reason: row.quality_reason.unwrap_or_default(),
            },
            "INVALID" => DataQualityFlag::Invalid {
                reason: row.quality_reason.unwrap_or_default(),
            },
            other => {
                return Err(FpmaError::data_source(format!(
                    "unrecognized quality_status '{other}' in store"
                )))
            }
        };

        Ok(FreightRecord {
            id: Uuid::parse_str(&row.id).map_err(|_| FpmaError::data_source("corrupt id in store"))?,
            record_date: row.record_date,
            origin: row.origin,
            destination: row.destination,
            carrier: row.carrier,
            transport_mode,
            freight_charge,
            currency_code: row.currency_code,
            source_system: row.source_system,
            data_quality_flag,
            ingested_at: row.ingested_at,
            is_deleted: row.is_deleted,
        })
    }
}

fn quality_parts(flag: &DataQualityFlag) -> (&'static str, Option<String>) {
    match flag {
        DataQualityFlag::Valid => ("VALID", None),
        DataQualityFlag::Warning { reason } => ("WARNING", Some(reason.clone())),
        DataQualityFlag::Invalid { reason } => ("INVALID", Some(reason.clone())),
    }
}

/// SQLite-backed `Store`, grounded on `storage::database::SqlitePool` and
/// `storage::repository::SqliteUsageRepository`'s pool + `query!`/`query_as!`
/// style.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS freight_records (
                id TEXT PRIMARY KEY,
                record_date TEXT NOT NULL,
                origin TEXT NOT NULL,
                destination TEXT NOT NULL,
                carrier TEXT NOT NULL,
                transport_mode TEXT NOT NULL,
                freight_charge TEXT NOT NULL,
                currency_code TEXT NOT NULL,
                source_system TEXT NOT NULL,
                quality_status TEXT NOT NULL,
                quality_reason TEXT,
                ingested_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                UNIQUE(source_system, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn append(&self, records: Vec<FreightRecord>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            let (status, reason) = quality_parts(&record.data_quality_flag);
            sqlx::query(
                r#"
                INSERT INTO freight_records (
                    id, record_date, origin, destination, carrier, transport_mode,
                    freight_charge, currency_code, source_system, quality_status,
                    quality_reason, ingested_at, is_deleted
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(source_system, id) DO UPDATE SET
                    record_date = excluded.record_date,
                    origin = excluded.origin,
                    destination = excluded.destination,
                    carrier = excluded.carrier,
                    transport_mode = excluded.transport_mode,
                    freight_charge = excluded.freight_charge,
                    currency_code = excluded.currency_code,
                    quality_status = excluded.quality_status,
                    quality_reason = excluded.quality_reason
                "#,
            )
            .bind(record.id.to_string())
            .bind(record.record_date)
            .bind(&record.origin)
            .bind(&record.destination)
            .bind(&record.carrier)
            .bind(record.transport_mode.as_str())
            .bind(record.freight_charge.to_string())
            .bind(&record.currency_code)
            .bind(&record.source_system)
            .bind(status)
            .bind(reason)
            .bind(record.ingested_at)
            .bind(record.is_deleted)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn range_scan(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        filters: &RangeScanFilters,
        exclude_invalid: bool,
    ) -> Result<Vec<FreightRecord>> {
        let rows: Vec<FreightRecordRow> = sqlx::query_as(
            r#"
            SELECT id, record_date, origin, destination, carrier, transport_mode,
                   freight_charge, currency_code, source_system, quality_status,
                   quality_reason, ingested_at, is_deleted
            FROM freight_records
            WHERE is_deleted = 0 AND record_date >= ? AND record_date <= ?
            ORDER BY record_date ASC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let record = FreightRecord::try_from(row)?;
            if exclude_invalid && record.data_quality_flag.is_invalid() {
                continue;
            }
            if !record_matches(&record, filters) {
                continue;
            }
            out.push(record);
        }
        Ok(out)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<FreightRecord> {
        let row: Option<FreightRecordRow> = sqlx::query_as(
            r#"
            SELECT id, record_date, origin, destination, carrier, transport_mode,
                   freight_charge, currency_code, source_system, quality_status,
                   quality_reason, ingested_at, is_deleted
            FROM freight_records WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => FreightRecord::try_from(row),
            None => Err(FpmaError::not_found(format!("record {id} not found"))),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE freight_records SET is_deleted = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FpmaError::not_found(format!("record {id} not found")));
        }
        Ok(())
    }
}

/// Debug helper used by the CLI preview command to render a record as JSON
/// without pulling the Presenter module in for a one-off.
pub fn record_to_debug_json(record: &FreightRecord) -> serde_json::Value {
    json!({
        "id": record.id.to_string(),
        "record_date": record.record_date,
        "origin": record.origin,
        "destination": record.destination,
        "freight_charge": record.freight_charge.to_string(),
        "currency_code": record.currency_code,
    })
}
