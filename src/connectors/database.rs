use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Row};
use tokio::sync::OnceCell;

use crate::domain::DataSourceConfig;
use crate::error::{FpmaError, Result};
use crate::validation::RawRecord;

use super::{required, ConnectorLifecycle, ConnectorState, DataSource};

/// Generic SQL-backed connector covering `DATABASE` and `ERP_ORACLE` (which
/// reuses the DATABASE parameter set keyed to an Oracle `service_name`).
/// Grounded on `storage::database::PostgresPool`'s pool-construction style.
pub struct DatabaseConnector {
    connection_url: String,
    query: String,
    pool: OnceCell<sqlx::PgPool>,
    lifecycle: ConnectorLifecycle,
}

impl DatabaseConnector {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        let host = required(&config.connection_params, "host")?;
        let port = required(&config.connection_params, "port")?;
        let database = required(&config.connection_params, "database")?;
        let username = required(&config.connection_params, "username")?;
        let password = required(&config.connection_params, "password")?;
        let query = required(&config.connection_params, "query")?;

        let connection_url = format!("postgres://{username}:{password}@{host}:{port}/{database}");

        Ok(Self {
            connection_url,
            query,
            pool: OnceCell::new(),
            lifecycle: ConnectorLifecycle::new(),
        })
    }

    async fn pool(&self) -> Result<&sqlx::PgPool> {
        self.pool
            .get_or_try_init(|| async {
                PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&self.connection_url)
                    .await
                    .map_err(FpmaError::from)
            })
            .await
    }
}

fn row_to_raw_record(row: &sqlx::postgres::PgRow) -> RawRecord {
    let mut raw = RawRecord::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let value: String = row
            .try_get::<String, _>(column.ordinal())
            .or_else(|_| row.try_get::<i64, _>(column.ordinal()).map(|v| v.to_string()))
            .or_else(|_| row.try_get::<f64, _>(column.ordinal()).map(|v| v.to_string()))
            .unwrap_or_default();
        raw.insert(name, value);
    }
    raw
}

#[async_trait]
impl DataSource for DatabaseConnector {
    async fn test_connection(&self) -> Result<()> {
        self.pool().await?;
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        self.pool().await?;
        self.lifecycle.mark_connected();
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.lifecycle.mark_disconnected();
        Ok(())
    }

    async fn fetch(
        &self,
        _query_params: &HashMap<String, String>,
        limit: Option<usize>,
    ) -> Result<Vec<RawRecord>> {
        if self.lifecycle.state() == ConnectorState::New {
            self.connect().await?;
        }
        self.lifecycle.mark_fetching();

        let pool = self.pool().await?;
        let rows = sqlx::query(&self.query).fetch_all(pool).await?;

        let mut out: Vec<RawRecord> = rows.iter().map(row_to_raw_record).collect();
        if let Some(limit) = limit {
            out.truncate(limit);
        }

        self.lifecycle.mark_connected();
        Ok(out)
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }
}
