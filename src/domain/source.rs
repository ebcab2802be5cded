use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The connector family a `DataSourceConfig` is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Csv,
    Database,
    Rest,
    Soap,
    Graphql,
    TmsSap,
    TmsOracle,
    TmsJda,
    ErpSap,
    ErpOracle,
    ErpDynamics,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Csv => "CSV",
            SourceType::Database => "DATABASE",
            SourceType::Rest => "REST",
            SourceType::Soap => "SOAP",
            SourceType::Graphql => "GRAPHQL",
            SourceType::TmsSap => "TMS_SAP",
            SourceType::TmsOracle => "TMS_ORACLE",
            SourceType::TmsJda => "TMS_JDA",
            SourceType::ErpSap => "ERP_SAP",
            SourceType::ErpOracle => "ERP_ORACLE",
            SourceType::ErpDynamics => "ERP_DYNAMICS",
        }
    }

    /// Connection-param keys this source type requires.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            SourceType::Csv => &["file_path", "field_mapping"],
            SourceType::Database => {
                &["host", "port", "database", "username", "password", "query", "field_mapping"]
            }
            SourceType::Rest => &["api_url", "auth_type", "field_mapping"],
            SourceType::Soap => &["api_url", "field_mapping"],
            SourceType::Graphql => &["api_url", "field_mapping"],
            SourceType::TmsSap => &["api_url", "auth_type", "field_mapping", "system_id", "client_number"],
            SourceType::TmsOracle => &["api_url", "auth_type", "field_mapping", "instance_id"],
            SourceType::TmsJda => &["api_url", "field_mapping", "environment"],
            SourceType::ErpSap => &["ashost", "sysnr", "client", "user", "passwd"],
            SourceType::ErpOracle => {
                &["host", "port", "database", "username", "password", "query", "field_mapping"]
            }
            SourceType::ErpDynamics => &["api_url", "auth_type", "field_mapping", "tenant_id"],
        }
    }
}

/// Operational status of a registered data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    Active,
    Inactive,
    Error,
}

/// Registered connector configuration. Owned by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub id: Uuid,
    pub name: String,
    pub source_type: SourceType,
    pub status: SourceStatus,
    pub connection_params: HashMap<String, String>,
    pub field_mapping: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical target fields every `field_mapping` must cover.
pub const REQUIRED_CANONICAL_FIELDS: &[&str] = &[
    "origin",
    "destination",
    "freight_charge",
    "currency_code",
    "record_date",
    "transport_mode",
];

impl DataSourceConfig {
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_type,
            status: SourceStatus::Active,
            connection_params: HashMap::new(),
            field_mapping: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_connection_params(mut self, params: HashMap<String, String>) -> Self {
        self.connection_params = params;
        self
    }

    pub fn with_field_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.field_mapping = mapping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_cover_tms_sap() {
        let keys = SourceType::TmsSap.required_keys();
        assert!(keys.contains(&"system_id"));
        assert!(keys.contains(&"client_number"));
        assert!(keys.contains(&"api_url"));
    }

    #[test]
    fn required_keys_cover_erp_sap_rfc_style() {
        let keys = SourceType::ErpSap.required_keys();
        assert_eq!(keys, &["ashost", "sysnr", "client", "user", "passwd"]);
    }
}
