use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{DataSourceConfig, SourceType};
use crate::error::Result;
use crate::validation::RawRecord;

use super::{http::HttpConnector, ConnectorState, DataSource};

/// TMS family connector. TMS_SAP/TMS_ORACLE/TMS_JDA embed a REST connector
/// rather than subclassing one; the only per-vendor difference is which
/// extra headers/params `HttpConnector` already derives from the shared
/// `connection_params` map.
pub struct TmsConnector {
    inner: HttpConnector,
}

impl TmsConnector {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        debug_assert!(matches!(
            config.source_type,
            SourceType::TmsSap | SourceType::TmsOracle | SourceType::TmsJda
        ));
        Ok(Self {
            inner: HttpConnector::new(config)?,
        })
    }
}

#[async_trait]
impl DataSource for TmsConnector {
    async fn test_connection(&self) -> Result<()> {
        self.inner.test_connection().await
    }

    async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }

    async fn fetch(
        &self,
        query_params: &HashMap<String, String>,
        limit: Option<usize>,
    ) -> Result<Vec<RawRecord>> {
        self.inner.fetch(query_params, limit).await
    }

    fn state(&self) -> ConnectorState {
        self.inner.state()
    }
}
