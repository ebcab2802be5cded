//! Field, record, and config validation with quality-flag assignment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    source::REQUIRED_CANONICAL_FIELDS, DataQualityFlag, DataSourceConfig, FreightRecord,
    TransportMode,
};
use crate::error::{FpmaError, Result};

static CURRENCY_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());

const LOW_CHARGE_THRESHOLD: &str = "1";
const HIGH_CHARGE_THRESHOLD: &str = "100000";

/// A raw record as handed off by a connector, keyed by source field name.
pub type RawRecord = HashMap<String, String>;

/// Validates and coerces a raw connector record into a canonical
/// `FreightRecord`, applying `field_mapping` first. Never rejects outright
/// except for missing required fields or type coercion failures; quality
/// problems are encoded in `data_quality_flag`.
pub fn validate_record(
    raw: &RawRecord,
    mapping: &HashMap<String, String>,
    source_system: &str,
) -> Result<FreightRecord> {
    let mapped = apply_field_mapping(raw, mapping);

    let origin = required_field(&mapped, "origin")?;
    let destination = required_field(&mapped, "destination")?;
    let carrier = mapped.get("carrier").cloned().unwrap_or_default();
    let record_date_raw = required_field(&mapped, "record_date")?;
    let freight_charge_raw = required_field(&mapped, "freight_charge")?;
    let currency_code_raw = required_field(&mapped, "currency_code")?;
    let transport_mode_raw = required_field(&mapped, "transport_mode")?;

    let record_date = coerce_record_date(&record_date_raw)?;
    let freight_charge = coerce_charge(&freight_charge_raw)?;
    let currency_code = currency_code_raw.trim().to_ascii_uppercase();
    let transport_mode = TransportMode::parse(&transport_mode_raw).ok_or_else(|| {
        FpmaError::validation(format!("unrecognized transport_mode '{transport_mode_raw}'"))
    })?;

    let now = Utc::now();
    let quality_flag = classify_quality(
        &origin,
        &destination,
        freight_charge,
        &currency_code,
        record_date,
        now,
    );

    Ok(FreightRecord {
        id: Uuid::new_v4(),
        record_date,
        origin,
        destination,
        carrier,
        transport_mode,
        freight_charge,
        currency_code,
        source_system: source_system.to_string(),
        data_quality_flag: quality_flag,
        ingested_at: now,
        is_deleted: false,
    })
}

fn apply_field_mapping(raw: &RawRecord, mapping: &HashMap<String, String>) -> RawRecord {
    let mut mapped = RawRecord::new();
    for (source_field, canonical_field) in mapping {
        if let Some(value) = raw.get(source_field) {
            mapped.insert(canonical_field.clone(), value.clone());
        }
    }
    // Fields already named canonically pass through untouched.
    for (key, value) in raw {
        mapped.entry(key.clone()).or_insert_with(|| value.clone());
    }
    mapped
}

fn required_field(mapped: &RawRecord, field: &str) -> Result<String> {
    mapped
        .get(field)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| FpmaError::validation(format!("missing required field '{field}'")))
}

fn coerce_record_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| DateTime::<Utc>::from_naive_utc_and_offset(d.and_hms_opt(0, 0, 0).unwrap(), Utc))
        })
        .map_err(|_| FpmaError::validation(format!("unparseable record_date '{raw}'")))
}

fn coerce_charge(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| FpmaError::validation(format!("unparseable freight_charge '{raw}'")))
}

fn classify_quality(
    origin: &str,
    destination: &str,
    charge: Decimal,
    currency_code: &str,
    record_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DataQualityFlag {
    let low_threshold: Decimal = LOW_CHARGE_THRESHOLD.parse().unwrap();
    let high_threshold: Decimal = HIGH_CHARGE_THRESHOLD.parse().unwrap();

    if charge <= Decimal::ZERO {
        return DataQualityFlag::Invalid {
            reason: "freight_charge must be greater than zero".to_string(),
        };
    }
    if record_date > now {
        return DataQualityFlag::Invalid {
            reason: "record_date is in the future".to_string(),
        };
    }
    if !CURRENCY_CODE_REGEX.is_match(currency_code) {
        return DataQualityFlag::Invalid {
            reason: format!("currency_code '{currency_code}' is not a valid ISO-4217 code"),
        };
    }

    if origin == destination {
        return DataQualityFlag::Warning {
            reason: "origin and destination are identical".to_string(),
        };
    }
    if charge < low_threshold {
        return DataQualityFlag::Warning {
            reason: "freight_charge is unusually low".to_string(),
        };
    }
    if charge > high_threshold {
        return DataQualityFlag::Warning {
            reason: "freight_charge is unusually high".to_string(),
        };
    }

    DataQualityFlag::Valid
}

/// Validates a `DataSourceConfig`: required connection-param keys per
/// source type and full `field_mapping` coverage of the canonical target
/// fields.
pub fn validate_config(config: &DataSourceConfig) -> Result<()> {
    for key in config.source_type.required_keys() {
        if !config.connection_params.contains_key(*key) {
            return Err(FpmaError::validation(format!(
                "data source '{}' is missing required connection param '{key}'",
                config.name
            )));
        }
    }

    let mapped_targets: std::collections::HashSet<&str> =
        config.field_mapping.values().map(|s| s.as_str()).collect();
    for field in REQUIRED_CANONICAL_FIELDS {
        if !mapped_targets.contains(field) {
            return Err(FpmaError::validation(format!(
                "field_mapping for '{}' does not cover canonical field '{field}'",
                config.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceType;

    fn raw(fields: &[(&str, &str)]) -> RawRecord {
        fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn identity_mapping() -> HashMap<String, String> {
        [
            "origin",
            "destination",
            "freight_charge",
            "currency_code",
            "record_date",
            "transport_mode",
        ]
        .iter()
        .map(|f| (f.to_string(), f.to_string()))
        .collect()
    }

    #[test]
    fn low_positive_charge_is_warning_not_invalid() {
        let raw = raw(&[
            ("origin", "NYC"),
            ("destination", "LAX"),
            ("freight_charge", "0.5"),
            ("currency_code", "USD"),
            ("record_date", "2023-01-01T00:00:00Z"),
            ("transport_mode", "ROAD"),
        ]);
        let record = validate_record(&raw, &identity_mapping(), "test").unwrap();
        assert!(matches!(record.data_quality_flag, DataQualityFlag::Warning { .. }));
    }

    #[test]
    fn zero_charge_is_invalid() {
        let raw = raw(&[
            ("origin", "NYC"),
            ("destination", "LAX"),
            ("freight_charge", "0"),
            ("currency_code", "USD"),
            ("record_date", "2023-01-01T00:00:00Z"),
            ("transport_mode", "ROAD"),
        ]);
        let record = validate_record(&raw, &identity_mapping(), "test").unwrap();
        assert!(record.data_quality_flag.is_invalid());
    }

    #[test]
    fn negative_charge_is_invalid() {
        let raw = raw(&[
            ("origin", "NYC"),
            ("destination", "LAX"),
            ("freight_charge", "-50"),
            ("currency_code", "USD"),
            ("record_date", "2023-01-01T00:00:00Z"),
            ("transport_mode", "ROAD"),
        ]);
        let record = validate_record(&raw, &identity_mapping(), "test").unwrap();
        assert!(record.data_quality_flag.is_invalid());
    }

    #[test]
    fn future_date_is_invalid() {
        let future = (Utc::now() + chrono::Duration::days(30))
            .to_rfc3339();
        let raw = raw(&[
            ("origin", "NYC"),
            ("destination", "LAX"),
            ("freight_charge", "1000"),
            ("currency_code", "USD"),
            ("record_date", &future),
            ("transport_mode", "ROAD"),
        ]);
        let record = validate_record(&raw, &identity_mapping(), "test").unwrap();
        assert!(record.data_quality_flag.is_invalid());
    }

    #[test]
    fn same_origin_destination_is_warning() {
        let raw = raw(&[
            ("origin", "NYC"),
            ("destination", "NYC"),
            ("freight_charge", "1000"),
            ("currency_code", "USD"),
            ("record_date", "2023-01-01T00:00:00Z"),
            ("transport_mode", "ROAD"),
        ]);
        let record = validate_record(&raw, &identity_mapping(), "test").unwrap();
        assert!(matches!(record.data_quality_flag, DataQualityFlag::Warning { .. }));
    }

    #[test]
    fn config_missing_required_key_is_rejected() {
        let config = DataSourceConfig::new("test", SourceType::Csv);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn config_with_full_coverage_is_accepted() {
        let mut config = DataSourceConfig::new("test", SourceType::Csv)
            .with_field_mapping(identity_mapping());
        config
            .connection_params
            .insert("file_path".to_string(), "/data/rates.csv".to_string());
        config
            .connection_params
            .insert("field_mapping".to_string(), "present".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
