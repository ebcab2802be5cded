use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{FpmaError, Result};

/// State of a single named breaker, mirroring the `DlqItem` status-enum
/// pattern: an explicit state plus mutating transition methods rather than a
/// bare counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

/// Per-operation finite-state machine. Not `Clone`/`Send` on its own; always
/// accessed through the registry's lock.
#[derive(Debug)]
pub struct Breaker {
    state: BreakerState,
    failure_count: u32,
    failure_threshold: u32,
    reset_timeout: Duration,
    /// Guards against multiple concurrent HALF_OPEN probes: set once a probe
    /// has been admitted and cleared on the probe's outcome.
    probe_in_flight: bool,
}

impl Breaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            failure_threshold,
            reset_timeout,
            probe_in_flight: false,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.probe_in_flight = false;
    }

    fn record_failure(&mut self) {
        match self.state {
            BreakerState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                }
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                self.probe_in_flight = false;
            }
            BreakerState::Open { .. } => {}
        }
    }

    /// Checks whether a call may proceed, transitioning OPEN -> HALF_OPEN
    /// when `reset_timeout` has elapsed. Must be called with the registry
    /// lock held so the check-and-transition is atomic across concurrent
    /// callers (serializes HALF_OPEN probes).
    fn try_acquire(&mut self, name: &str) -> Result<()> {
        match self.state {
            BreakerState::Closed => Ok(()),
            BreakerState::HalfOpen => {
                if self.probe_in_flight {
                    Err(FpmaError::circuit_open(name, 0))
                } else {
                    self.probe_in_flight = true;
                    Ok(())
                }
            }
            BreakerState::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen;
                    self.probe_in_flight = true;
                    Ok(())
                } else {
                    let remaining = self.reset_timeout - elapsed;
                    Err(FpmaError::circuit_open(name, remaining.as_secs()))
                }
            }
        }
    }
}

/// Process-wide breaker state, keyed by operation name (e.g.
/// `connector:<source_id>`). An explicit injected service rather than
/// language-level global state, so tests can construct an isolated
/// registry per case.
pub struct BreakerRegistry {
    breakers: Mutex<HashMap<String, Breaker>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            failure_threshold,
            reset_timeout,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// Checks out the named breaker and admits or rejects the next call.
    pub fn guard(&self, name: &str) -> Result<()> {
        let mut breakers = self.breakers.lock().expect("breaker registry poisoned");
        let breaker = breakers
            .entry(name.to_string())
            .or_insert_with(|| Breaker::new(self.failure_threshold, self.reset_timeout));
        breaker.try_acquire(name)
    }

    pub fn record_success(&self, name: &str) {
        let mut breakers = self.breakers.lock().expect("breaker registry poisoned");
        if let Some(breaker) = breakers.get_mut(name) {
            breaker.record_success();
        }
    }

    pub fn record_failure(&self, name: &str) {
        let mut breakers = self.breakers.lock().expect("breaker registry poisoned");
        let breaker = breakers
            .entry(name.to_string())
            .or_insert_with(|| Breaker::new(self.failure_threshold, self.reset_timeout));
        breaker.record_failure();
    }

    pub fn state_of(&self, name: &str) -> Option<BreakerState> {
        let breakers = self.breakers.lock().expect("breaker registry poisoned");
        breakers.get(name).map(|b| b.state())
    }
}
