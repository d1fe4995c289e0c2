//! Per-node breaker entry (§3 "Circuit breaker entry", §4.6).

use crate::backoff::ExponentialBackoff;
use crate::state::{AllowDecision, CircuitSnapshot, CircuitState};
use std::time::{Duration, Instant};

pub(crate) struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    retry_at: Option<Instant>,
    /// Set while a HalfOpen probe is outstanding; cleared by the matching
    /// `on_success`/`on_failure`. Enforces "at most one request is admitted
    /// per node while in HalfOpen" (§3 invariant).
    half_open_reserved: bool,
    /// Count of consecutive HalfOpen probe failures, driving the backoff
    /// curve's exponent (§4.6).
    half_open_failures: u32,
}

impl Circuit {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            retry_at: None,
            half_open_reserved: false,
            half_open_failures: 0,
        }
    }

    fn open(&mut self, now: Instant, cooldown: Duration) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.retry_at = Some(now + cooldown);
        self.half_open_reserved = false;
    }

    /// Non-mutating peek used by candidate filtering (§4.7 step 1), so
    /// building the admitted-candidate list doesn't itself consume a
    /// node's single HalfOpen probe slot before a node is actually chosen.
    pub(crate) fn would_allow(&self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => self.retry_at.is_some_and(|t| now >= t),
            CircuitState::HalfOpen => !self.half_open_reserved,
        }
    }

    /// The committing check (§4.6 `Allow`): transitions Open -> HalfOpen and
    /// reserves the probe slot when the cooldown has elapsed.
    pub(crate) fn allow(&mut self, now: Instant) -> AllowDecision {
        match self.state {
            CircuitState::Closed => AllowDecision::Ok,
            CircuitState::Open => match self.retry_at {
                Some(retry_at) if now >= retry_at => {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_reserved = true;
                    AllowDecision::Ok
                }
                Some(retry_at) => AllowDecision::OpenUntil(retry_at),
                None => AllowDecision::Ok,
            },
            CircuitState::HalfOpen => {
                if self.half_open_reserved {
                    AllowDecision::OpenUntil(self.retry_at.unwrap_or(now))
                } else {
                    self.half_open_reserved = true;
                    AllowDecision::Ok
                }
            }
        }
    }

    pub(crate) fn on_success(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.half_open_failures = 0;
        self.half_open_reserved = false;
        self.opened_at = None;
        self.retry_at = None;
    }

    pub(crate) fn on_failure(
        &mut self,
        now: Instant,
        failure_threshold: u32,
        base_cooldown: Duration,
        backoff: &ExponentialBackoff,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= failure_threshold {
                    self.open(now, base_cooldown);
                }
            }
            CircuitState::HalfOpen => {
                let attempt = self.half_open_failures;
                self.half_open_failures += 1;
                self.consecutive_failures += 1;
                self.open(now, backoff.cooldown_for(attempt));
            }
            CircuitState::Open => {
                // Allow() gates dispatch, so a failure shouldn't normally
                // arrive while Open; ignore rather than double-penalize.
            }
        }
    }

    pub(crate) fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            retry_at: self.retry_at,
        }
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::closed()
    }
}
