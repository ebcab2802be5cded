//! Error taxonomy shared across the ingestion pipeline, the analysis engine
//! and the resilience layer.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FpmaError>;

/// Tagged error kinds, one variant per row of the error handling table.
#[derive(Debug, Error)]
pub enum FpmaError {
    #[error("validation error: {message}")]
    Validation {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("not found: {message}")]
    NotFound {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("data source error: {message}")]
    DataSource {
        message: String,
        details: BTreeMap<String, String>,
        #[source]
        cause: Option<Box<FpmaError>>,
    },

    #[error("analysis error: {message}")]
    Analysis {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("authentication error: {message}")]
    Authentication {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("authorization error: {message}")]
    Authorization {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("integration error: {message}")]
    Integration {
        message: String,
        details: BTreeMap<String, String>,
        #[source]
        cause: Option<Box<FpmaError>>,
    },

    #[error("circuit open for {name}, retry after {remaining_secs}s")]
    CircuitOpen { name: String, remaining_secs: u64 },
}

impl FpmaError {
    /// Three-letter tag used in the `FPMA-<kind3>-<6hex>` error code.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            FpmaError::Validation { .. } => "VAL",
            FpmaError::NotFound { .. } => "NFD",
            FpmaError::DataSource { .. } => "DSR",
            FpmaError::Analysis { .. } => "ANL",
            FpmaError::Configuration { .. } => "CFG",
            FpmaError::Authentication { .. } => "AUT",
            FpmaError::Authorization { .. } => "ATZ",
            FpmaError::Integration { .. } => "INT",
            FpmaError::CircuitOpen { .. } => "CIR",
        }
    }

    /// Deterministic error code `FPMA-<kind3>-<6hex>`, derived from a hash of
    /// `"{message}:{details}"` truncated to six hex characters via
    /// sha2-256, which keeps codes stable across runs for the same error.
    pub fn error_code(&self) -> String {
        let message = self.message();
        let details = self.details_string();
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", message, details).as_bytes());
        let digest = hasher.finalize();
        let hex = hex_encode(&digest[..3]);
        format!("FPMA-{}-{}", self.kind_tag(), hex.to_uppercase())
    }

    pub fn message(&self) -> &str {
        match self {
            FpmaError::Validation { message, .. }
            | FpmaError::NotFound { message, .. }
            | FpmaError::DataSource { message, .. }
            | FpmaError::Analysis { message, .. }
            | FpmaError::Configuration { message, .. }
            | FpmaError::Authentication { message, .. }
            | FpmaError::Authorization { message, .. }
            | FpmaError::Integration { message, .. } => message,
            FpmaError::CircuitOpen { name, .. } => name,
        }
    }

    fn details_string(&self) -> String {
        let details = match self {
            FpmaError::Validation { details, .. }
            | FpmaError::NotFound { details, .. }
            | FpmaError::DataSource { details, .. }
            | FpmaError::Analysis { details, .. }
            | FpmaError::Configuration { details, .. }
            | FpmaError::Authentication { details, .. }
            | FpmaError::Authorization { details, .. }
            | FpmaError::Integration { details, .. } => Some(details),
            FpmaError::CircuitOpen { .. } => None,
        };
        match details {
            Some(d) => d
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(","),
            None => String::new(),
        }
    }

    /// Whether this error kind is eligible for retry consideration at all.
    /// Retry eligibility also depends on sub-condition matching; see
    /// `resilience::retry::is_retryable`.
    pub fn is_retryable_kind(&self) -> bool {
        matches!(self, FpmaError::DataSource { .. } | FpmaError::Integration { .. })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FpmaError::Validation {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn validation_with(message: impl Into<String>, details: BTreeMap<String, String>) -> Self {
        FpmaError::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        FpmaError::NotFound {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn data_source(message: impl Into<String>) -> Self {
        FpmaError::DataSource {
            message: message.into(),
            details: BTreeMap::new(),
            cause: None,
        }
    }

    pub fn data_source_with_details(
        message: impl Into<String>,
        details: BTreeMap<String, String>,
    ) -> Self {
        FpmaError::DataSource {
            message: message.into(),
            details,
            cause: None,
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        FpmaError::Analysis {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        FpmaError::Configuration {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn integration(message: impl Into<String>) -> Self {
        FpmaError::Integration {
            message: message.into(),
            details: BTreeMap::new(),
            cause: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        FpmaError::Authentication {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn circuit_open(name: impl Into<String>, remaining_secs: u64) -> Self {
        FpmaError::CircuitOpen {
            name: name.into(),
            remaining_secs,
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl From<sqlx::Error> for FpmaError {
    fn from(err: sqlx::Error) -> Self {
        FpmaError::DataSource {
            message: err.to_string(),
            details: BTreeMap::new(),
            cause: None,
        }
    }
}

impl From<serde_json::Error> for FpmaError {
    fn from(err: serde_json::Error) -> Self {
        FpmaError::Configuration {
            message: err.to_string(),
            details: BTreeMap::new(),
        }
    }
}

impl From<reqwest::Error> for FpmaError {
    fn from(err: reqwest::Error) -> Self {
        FpmaError::Integration {
            message: err.to_string(),
            details: BTreeMap::new(),
            cause: None,
        }
    }
}

impl From<csv::Error> for FpmaError {
    fn from(err: csv::Error) -> Self {
        FpmaError::DataSource {
            message: err.to_string(),
            details: BTreeMap::new(),
            cause: None,
        }
    }
}

impl From<toml::de::Error> for FpmaError {
    fn from(err: toml::de::Error) -> Self {
        FpmaError::Configuration {
            message: err.to_string(),
            details: BTreeMap::new(),
        }
    }
}

impl From<std::io::Error> for FpmaError {
    fn from(err: std::io::Error) -> Self {
        FpmaError::Configuration {
            message: err.to_string(),
            details: BTreeMap::new(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper used when the code (not the error) needs to cross an API
/// boundary on its own, e.g. in a response envelope built by a caller.
pub struct ErrorCode(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_table() {
        assert_eq!(FpmaError::validation("x").kind_tag(), "VAL");
        assert_eq!(FpmaError::not_found("x").kind_tag(), "NFD");
        assert_eq!(FpmaError::circuit_open("op", 5).kind_tag(), "CIR");
    }

    #[test]
    fn error_code_is_deterministic() {
        let a = FpmaError::validation("bad currency code");
        let b = FpmaError::validation("bad currency code");
        assert_eq!(a.error_code(), b.error_code());
        assert!(a.error_code().starts_with("FPMA-VAL-"));
    }

    #[test]
    fn error_code_differs_by_message() {
        let a = FpmaError::validation("bad currency code");
        let b = FpmaError::validation("missing field");
        assert_ne!(a.error_code(), b.error_code());
    }

    #[test]
    fn retryable_kinds() {
        assert!(FpmaError::data_source("timeout").is_retryable_kind());
        assert!(FpmaError::integration("timeout").is_retryable_kind());
        assert!(!FpmaError::validation("bad").is_retryable_kind());
        assert!(!FpmaError::not_found("missing").is_retryable_kind());
    }
}
