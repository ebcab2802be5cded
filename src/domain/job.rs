use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Running,
    Success,
    Partial,
    Failed,
}

/// Record of a single `ingest` invocation against one data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub id: Uuid,
    pub source_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub total: u64,
    pub valid: u64,
    pub warning: u64,
    pub invalid: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Maximum number of individual error/warning strings retained per job.
pub const MAX_CAPTURED_MESSAGES: usize = 100;

impl IngestionJob {
    pub fn start(source_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            started_at: Utc::now(),
            finished_at: None,
            status: JobStatus::Running,
            total: 0,
            valid: 0,
            warning: 0,
            invalid: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_valid(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.total += 1;
        self.valid += 1;
        self.warning += 1;
        if self.warnings.len() < MAX_CAPTURED_MESSAGES {
            self.warnings.push(message.into());
        }
    }

    pub fn record_invalid(&mut self, message: impl Into<String>) {
        self.total += 1;
        self.invalid += 1;
        if self.errors.len() < MAX_CAPTURED_MESSAGES {
            self.errors.push(message.into());
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.errors.len() < MAX_CAPTURED_MESSAGES {
            self.errors.push(message.into());
        }
    }

    /// Finalizes status: SUCCESS if invalid=0 and no errors, PARTIAL if at
    /// least one valid and at least one failure, FAILED if no valid
    /// records were produced at all.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        let had_failures = self.invalid > 0 || !self.errors.is_empty();
        self.status = if !had_failures {
            JobStatus::Success
        } else if self.valid > 0 {
            JobStatus::Partial
        } else {
            JobStatus::Failed
        };
    }

    pub fn finish_cancelled(&mut self, reason: impl Into<String>) {
        self.record_error(reason);
        self.finished_at = Some(Utc::now());
        self.status = JobStatus::Failed;
    }

    pub fn summary(&self) -> String {
        format!(
            "{:?}: total={} valid={} warning={} invalid={}",
            self.status, self.total, self.valid, self.warning, self.invalid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_valid_is_success() {
        let mut job = IngestionJob::start(Uuid::new_v4());
        job.record_valid();
        job.record_valid();
        job.finish();
        assert_eq!(job.status, JobStatus::Success);
    }

    #[test]
    fn mixed_outcomes_is_partial() {
        let mut job = IngestionJob::start(Uuid::new_v4());
        job.record_valid();
        job.record_invalid("future date");
        job.finish();
        assert_eq!(job.status, JobStatus::Partial);
        assert_eq!(job.total, 2);
    }

    #[test]
    fn all_invalid_is_failed() {
        let mut job = IngestionJob::start(Uuid::new_v4());
        job.record_invalid("bad currency");
        job.finish();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn message_capture_is_capped() {
        let mut job = IngestionJob::start(Uuid::new_v4());
        for i in 0..150 {
            job.record_invalid(format!("bad row {i}"));
        }
        assert_eq!(job.errors.len(), MAX_CAPTURED_MESSAGES);
        assert_eq!(job.invalid, 150);
    }
}
