use std::time::Duration;

use rand::Rng;

use crate::error::FpmaError;

/// Error kinds eligible for retry, before sub-condition matching.
const DEFAULT_RETRYABLE_SUBSTRINGS: &[&str] = &["connection", "timeout", "temporary", "retry"];
const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Transient-failure retry policy: an attempt-counter-plus-exponential-backoff
/// loop using the `backoff_factor x 2^(attempt-1)` formula.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 1.5,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            backoff_factor,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Delay before the next attempt, given the attempt number just failed
    /// (1-indexed): `backoff_factor * 2^(attempt-1)` seconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let seconds = self.backoff_factor * 2f64.powi(attempt as i32 - 1);
        let seconds = if self.jitter {
            let mut rng = rand::thread_rng();
            seconds * rng.gen_range(0.5..1.5)
        } else {
            seconds
        };
        Duration::from_secs_f64(seconds.max(0.0))
    }

    /// Whether `err` is eligible for retry: kind must be in
    /// `{DataSource, Integration}` AND either its message contains one of the
    /// default retryable substrings or it embeds an HTTP-like retryable
    /// status code.
    pub fn is_retryable(&self, err: &FpmaError) -> bool {
        if !err.is_retryable_kind() {
            return false;
        }
        let message = err.message().to_ascii_lowercase();
        if DEFAULT_RETRYABLE_SUBSTRINGS
            .iter()
            .any(|needle| message.contains(needle))
        {
            return true;
        }
        status_code_in_message(&message)
            .map(|status| DEFAULT_RETRYABLE_STATUSES.contains(&status))
            .unwrap_or(false)
    }
}

fn status_code_in_message(message: &str) -> Option<u16> {
    DEFAULT_RETRYABLE_STATUSES
        .iter()
        .copied()
        .find(|status| message.contains(&status.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::new(5, 1.5);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs_f64(1.5));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs_f64(3.0));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs_f64(6.0));
    }

    #[test]
    fn non_retryable_kinds_abort_immediately() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_retryable(&FpmaError::validation("bad field")));
        assert!(!policy.is_retryable(&FpmaError::not_found("missing record")));
    }

    #[test]
    fn retryable_kind_with_matching_substring() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&FpmaError::data_source("connection reset by peer")));
    }

    #[test]
    fn retryable_kind_with_status_code() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&FpmaError::integration("upstream returned 503")));
    }

    #[test]
    fn retryable_kind_without_substring_or_status_is_not_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_retryable(&FpmaError::data_source("malformed payload")));
    }
}
