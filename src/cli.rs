//! Command-line argument definitions: top-level flags plus one subcommand
//! per pipeline/engine operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "fpma")]
#[command(about = "Freight Price Movement Agent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a data source.
    RegisterSource {
        /// Source config as a JSON file.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run an ingestion job against a registered source.
    Ingest {
        /// Data source ID.
        #[arg(long)]
        source_id: Uuid,

        /// Extra query params as `key=value`, repeatable.
        #[arg(long = "param")]
        params: Vec<String>,
    },

    /// Fetch and validate a sample of records without persisting.
    Preview {
        #[arg(long)]
        source_id: Uuid,

        #[arg(long = "param")]
        params: Vec<String>,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Register a cron schedule for a source (bookkeeping only; no execution).
    Schedule {
        #[arg(long)]
        source_id: Uuid,

        /// Cron expression, e.g. "0 0 * * *".
        #[arg(long)]
        expr: String,
    },

    /// Run a price-movement analysis and render the result.
    Analyze {
        /// Analysis request as a JSON file.
        #[arg(short, long)]
        file: PathBuf,

        /// Output format: json, csv, or text.
        #[arg(long, default_value = "json")]
        output: String,
    },

    /// Show an ingestion job's status.
    JobStatus {
        #[arg(long)]
        job_id: Uuid,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parses repeated `--param key=value` flags into a map, as used by
/// `Ingest`/`Preview`.
pub fn parse_params(raw: &[String]) -> std::collections::HashMap<String, String> {
    raw.iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_splits_on_equals() {
        let raw = vec!["origin=LAX".to_string(), "destination=NYC".to_string()];
        let params = parse_params(&raw);
        assert_eq!(params.get("origin").map(String::as_str), Some("LAX"));
        assert_eq!(params.get("destination").map(String::as_str), Some("NYC"));
    }

    #[test]
    fn parse_params_ignores_malformed_entries() {
        let raw = vec!["no-equals-sign".to_string()];
        assert!(parse_params(&raw).is_empty());
    }
}
