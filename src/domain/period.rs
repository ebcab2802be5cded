use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FpmaError, Result};

/// Bucketing cadence used by the Time Bucketer and requested in an
/// `AnalysisRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Custom,
}

/// The time window and cadence an analysis is computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub granularity: Granularity,
    pub custom_interval_days: Option<u32>,
}

impl TimePeriod {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            start_date,
            end_date,
            granularity,
            custom_interval_days: None,
        }
    }

    pub fn with_custom_interval(mut self, days: u32) -> Self {
        self.custom_interval_days = Some(days);
        self
    }

    /// Validates the `start_date < end_date` and CUSTOM-interval invariants.
    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(FpmaError::validation("start_date must be before end_date"));
        }
        if self.granularity == Granularity::Custom {
            match self.custom_interval_days {
                Some(days) if days > 0 => {}
                _ => {
                    return Err(FpmaError::validation(
                        "custom_interval_days must be greater than zero for CUSTOM granularity",
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_date && instant <= self.end_date
    }
}
