use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mode of transport a freight charge was incurred under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportMode {
    Air,
    Ocean,
    Road,
    Rail,
    Multimodal,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Air => "AIR",
            TransportMode::Ocean => "OCEAN",
            TransportMode::Road => "ROAD",
            TransportMode::Rail => "RAIL",
            TransportMode::Multimodal => "MULTIMODAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "AIR" => Some(TransportMode::Air),
            "OCEAN" => Some(TransportMode::Ocean),
            "ROAD" => Some(TransportMode::Road),
            "RAIL" => Some(TransportMode::Rail),
            "MULTIMODAL" => Some(TransportMode::Multimodal),
            _ => None,
        }
    }
}

/// Per-record quality assessment produced by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum DataQualityFlag {
    Valid,
    Warning { reason: String },
    Invalid { reason: String },
}

impl DataQualityFlag {
    pub fn is_invalid(&self) -> bool {
        matches!(self, DataQualityFlag::Invalid { .. })
    }
}

/// The normalized, immutable-once-stored unit of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreightRecord {
    pub id: Uuid,
    pub record_date: DateTime<Utc>,
    pub origin: String,
    pub destination: String,
    pub carrier: String,
    pub transport_mode: TransportMode,
    pub freight_charge: Decimal,
    pub currency_code: String,
    pub source_system: String,
    pub data_quality_flag: DataQualityFlag,
    pub ingested_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl FreightRecord {
    /// True when the record should participate in analysis by default
    /// (non-deleted, non-INVALID).
    pub fn is_analyzable(&self) -> bool {
        !self.is_deleted && !self.data_quality_flag.is_invalid()
    }
}
