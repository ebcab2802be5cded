//! Ingestion Pipeline connector -> validate -> normalize -> persist,
//! plus data-source registry and schedule bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::connectors::{create_connector, DataSource};
use crate::domain::{DataSourceConfig, FreightRecord, IngestionJob, JobStatus, SourceStatus};
use crate::error::{FpmaError, Result};
use crate::resilience::{BreakerRegistry, RetryPolicy};
use crate::store::Store;
use crate::validation::{validate_config, validate_record, RawRecord};

/// Default flush buffer size, overridable via `AppConfig::ingest_batch_size`.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

struct ScheduleEntry {
    source_id: Uuid,
    expression: String,
    query_params: HashMap<String, String>,
}

/// Orchestrates ingestion runs and owns `DataSourceConfig` registration,
/// a source registry plus fetch/validate/persist pipeline in one type.
pub struct IngestionPipeline {
    store: Arc<dyn Store>,
    breakers: Arc<BreakerRegistry>,
    retry_policy: RetryPolicy,
    batch_size: usize,
    sources: tokio::sync::RwLock<HashMap<Uuid, DataSourceConfig>>,
    jobs: tokio::sync::RwLock<HashMap<Uuid, IngestionJob>>,
    schedules: tokio::sync::RwLock<HashMap<Uuid, ScheduleEntry>>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            breakers: Arc::new(BreakerRegistry::with_defaults()),
            retry_policy: RetryPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            sources: tokio::sync::RwLock::new(HashMap::new()),
            jobs: tokio::sync::RwLock::new(HashMap::new()),
            schedules: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    // --- registry operations, folded in from DataIngestionService ---

    pub async fn register_data_source(&self, config: DataSourceConfig) -> Result<Uuid> {
        validate_config(&config)?;
        let id = config.id;
        self.sources.write().await.insert(id, config);
        Ok(id)
    }

    pub async fn get_data_source(&self, id: Uuid) -> Result<DataSourceConfig> {
        self.sources
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| FpmaError::not_found(format!("data source {id} not found")))
    }

    pub async fn list_data_sources(&self) -> Vec<DataSourceConfig> {
        self.sources.read().await.values().cloned().collect()
    }

    pub async fn update_data_source(&self, config: DataSourceConfig) -> Result<()> {
        validate_config(&config)?;
        let mut sources = self.sources.write().await;
        if !sources.contains_key(&config.id) {
            return Err(FpmaError::not_found(format!("data source {} not found", config.id)));
        }
        let mut config = config;
        config.updated_at = Utc::now();
        sources.insert(config.id, config);
        Ok(())
    }

    pub async fn delete_data_source(&self, id: Uuid) -> Result<()> {
        self.sources
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FpmaError::not_found(format!("data source {id} not found")))
    }

    pub async fn get_data_source_status(&self, id: Uuid) -> Result<SourceStatus> {
        Ok(self.get_data_source(id).await?.status)
    }

    pub async fn list_scheduled(&self) -> Vec<(Uuid, String)> {
        self.schedules
            .read()
            .await
            .values()
            .map(|e| (e.source_id, e.expression.clone()))
            .collect()
    }

    /// Registers an opaque schedule expression. Syntax validation only
    /// (via the `cron` crate); the pipeline never executes schedules
    /// itself — actual cron/interval dispatch is left to the caller.
    pub async fn schedule(
        &self,
        source_id: Uuid,
        expression: String,
        query_params: HashMap<String, String>,
    ) -> Result<Uuid> {
        expression
            .parse::<cron::Schedule>()
            .map_err(|e| FpmaError::validation(format!("invalid schedule expression: {e}")))?;
        let job_id = Uuid::new_v4();
        self.schedules.write().await.insert(
            job_id,
            ScheduleEntry {
                source_id,
                expression,
                query_params,
            },
        );
        Ok(job_id)
    }

    pub async fn cancel_scheduled(&self, job_id: Uuid) -> Result<()> {
        self.schedules
            .write()
            .await
            .remove(&job_id)
            .map(|_| ())
            .ok_or_else(|| FpmaError::not_found(format!("scheduled job {job_id} not found")))
    }

    // --- ingestion operations ---

    /// Fetches from the registered source, validates each record, and
    /// persists valid/warning records in batches of `batch_size`.
    pub async fn ingest(&self, source_id: Uuid, query_params: Option<HashMap<String, String>>) -> Result<IngestionJob> {
        let config = self.get_data_source(source_id).await?;
        if config.status == SourceStatus::Inactive {
            return Err(FpmaError::configuration(format!(
                "data source {source_id} is inactive"
            )));
        }

        let mut job = IngestionJob::start(source_id);
        let operation_name = format!("connector:{source_id}");
        let query_params = query_params.unwrap_or_default();

        let outcome = self
            .run_ingestion_scope(&config, &query_params, &mut job)
            .await;

        if let Err(err) = &outcome {
            warn!(source_id = %source_id, error = %err, "ingestion scope failed");
            job.record_error(err.to_string());
        }

        job.finish();
        self.jobs.write().await.insert(job.id, job.clone());
        info!(source_id = %source_id, job_id = %job.id, summary = %job.summary(), "ingestion finished");

        if job.valid > 0 {
            // Let callers invalidate stale cached analyses; the Analysis
            // Engine owns the cache, so this pipeline only reports back the
            // ingested date range through the job record the caller already
            // has access to.
        }
        let _ = operation_name;
        Ok(job)
    }

    async fn run_ingestion_scope(
        &self,
        config: &DataSourceConfig,
        query_params: &HashMap<String, String>,
        job: &mut IngestionJob,
    ) -> Result<()> {
        let operation_name = format!("connector:{}", config.id);
        let connector = create_connector(config)?;

        let fetch_result = crate::resilience::call_guarded(&self.breakers, &operation_name, &self.retry_policy, || {
            let query_params = query_params.clone();
            async { connector.fetch(&query_params, None).await }
        })
        .await;

        let raw_records = match fetch_result {
            Ok(records) => records,
            Err(err) => {
                let _ = connector.disconnect().await;
                return Err(err);
            }
        };

        let mut buffer: Vec<FreightRecord> = Vec::with_capacity(self.batch_size);
        for raw in &raw_records {
            match validate_and_count(raw, config, job) {
                Some(record) => {
                    buffer.push(record);
                    if buffer.len() >= self.batch_size {
                        self.flush(&mut buffer).await?;
                    }
                }
                None => continue,
            }
        }
        self.flush(&mut buffer).await?;

        // Always run disconnect, on every exit path.
        connector.disconnect().await?;
        Ok(())
    }

    async fn flush(&self, buffer: &mut Vec<FreightRecord>) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(buffer);
        self.store.append(batch).await
    }

    /// Runs fetch + validate without persistence, capped at `limit` records.
    pub async fn preview(
        &self,
        source_id: Uuid,
        query_params: Option<HashMap<String, String>>,
        limit: usize,
    ) -> Result<Vec<FreightRecord>> {
        let config = self.get_data_source(source_id).await?;
        let connector = create_connector(&config)?;
        let query_params = query_params.unwrap_or_default();

        let raw_records = connector.fetch(&query_params, Some(limit)).await;
        let raw_records = match raw_records {
            Ok(records) => records,
            Err(err) => {
                let _ = connector.disconnect().await;
                return Err(err);
            }
        };

        let mut preview_job = IngestionJob::start(source_id);
        let mut out = Vec::new();
        for raw in raw_records.iter().take(limit) {
            if let Some(record) = validate_and_count(raw, &config, &mut preview_job) {
                out.push(record);
            }
        }

        connector.disconnect().await?;
        Ok(out)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<IngestionJob> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| FpmaError::not_found(format!("ingestion job {job_id} not found")))
    }

    pub async fn list_jobs(&self) -> Vec<IngestionJob> {
        self.jobs.read().await.values().cloned().collect()
    }
}

fn validate_and_count(raw: &RawRecord, config: &DataSourceConfig, job: &mut IngestionJob) -> Option<FreightRecord> {
    match validate_record(raw, &config.field_mapping, &config.name) {
        Ok(record) => {
            use crate::domain::DataQualityFlag;
            match &record.data_quality_flag {
                DataQualityFlag::Valid => job.record_valid(),
                DataQualityFlag::Warning { reason } => job.record_warning(reason.clone()),
                DataQualityFlag::Invalid { reason } => {
                    job.record_invalid(reason.clone());
                    return Some(record);
                }
            }
            Some(record)
        }
        Err(err) => {
            job.record_error(err.to_string());
            None
        }
    }
}
