//! Retry policy, circuit breaker, and the glue that runs an operation
//! through both together.

pub mod breaker;
pub mod retry;

pub use breaker::{Breaker, BreakerRegistry, BreakerState};
pub use retry::RetryPolicy;

use crate::error::{FpmaError, Result};
use std::future::Future;
use std::sync::Arc;

/// Runs `op` through a named breaker and a retry policy together, opening a
/// scope keyed by operation name (e.g. `connector:<source_id>`). The
/// breaker gate is checked before every attempt; retry delay/backoff is
/// applied between attempts the same way `RetryPolicy::execute` applies it
/// alone.
pub async fn call_guarded<F, Fut, T>(
    registry: &Arc<BreakerRegistry>,
    operation_name: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        registry.guard(operation_name)?;

        match op().await {
            Ok(value) => {
                registry.record_success(operation_name);
                return Ok(value);
            }
            Err(err) => {
                registry.record_failure(operation_name);
                if attempt >= policy.max_attempts || !policy.is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.backoff_delay(attempt);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Convenience wrapper converting a breaker short-circuit rejection into a
/// `CircuitOpen` error at the call site; kept separate from `guard` so pure
/// breaker tests can inspect state transitions without going through retry.
pub fn require_not_open(name: &str, state: &BreakerState, remaining_secs: u64) -> Result<()> {
    match state {
        BreakerState::Open { .. } => Err(FpmaError::circuit_open(name, remaining_secs)),
        _ => Ok(()),
    }
}
