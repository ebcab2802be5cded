use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::DataSourceConfig;
use crate::error::{FpmaError, Result};
use crate::validation::RawRecord;

use super::{optional, required, ConnectorLifecycle, ConnectorState, DataSource};

/// CSV file connector: UTF-8, comma-separated by default, optional header.
pub struct CsvConnector {
    file_path: String,
    delimiter: u8,
    has_header: bool,
    lifecycle: ConnectorLifecycle,
}

impl CsvConnector {
    pub fn new(config: &DataSourceConfig) -> Result<Self> {
        let file_path = required(&config.connection_params, "file_path")?;
        let delimiter = optional(&config.connection_params, "delimiter", ",")
            .bytes()
            .next()
            .unwrap_or(b',');
        let has_header = optional(&config.connection_params, "has_header", "true")
            .parse()
            .unwrap_or(true);
        Ok(Self {
            file_path,
            delimiter,
            has_header,
            lifecycle: ConnectorLifecycle::new(),
        })
    }
}

#[async_trait]
impl DataSource for CsvConnector {
    async fn test_connection(&self) -> Result<()> {
        if std::path::Path::new(&self.file_path).exists() {
            Ok(())
        } else {
            Err(FpmaError::data_source(format!(
                "csv file not found: {}",
                self.file_path
            )))
        }
    }

    async fn connect(&self) -> Result<()> {
        self.test_connection().await?;
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

        let path = self.file_path.clone();
        let delimiter = self.delimiter;
        let has_header = self.has_header;
        let limit = limit;

        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<RawRecord>> {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(has_header)
                .from_path(&path)?;

            let headers: Vec<String> = if has_header {
                reader.headers()?.iter().map(|h| h.to_string()).collect()
            } else {
                Vec::new()
            };

            let mut out = Vec::new();
            for result in reader.records() {
                let record = result?;
                let mut row = RawRecord::new();
                for (idx, field) in record.iter().enumerate() {
                    let key = headers
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| idx.to_string());
                    row.insert(key, field.to_string());
                }
                out.push(row);
                if let Some(limit) = limit {
                    if out.len() >= limit {
                        break;
                    }
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| FpmaError::data_source(format!("csv read task panicked: {e}")))??;

        self.lifecycle.mark_connected();
        Ok(rows)
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }
}
