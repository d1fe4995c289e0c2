//! Circuit Breaker Table (§4.6): one breaker per node, grounded on the
//! teacher's `tower-resilience-circuitbreaker::circuit::Circuit` generalized
//! from a single service instance to a `HashMap<NodeId, Circuit>`.

use crate::backoff::ExponentialBackoff;
use crate::entry::Circuit;
use crate::state::{AllowDecision, CircuitSnapshot, CircuitState};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub max_cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            max_cooldown: Duration::from_secs(300),
        }
    }
}

pub struct CircuitBreakerTable {
    circuits: RwLock<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
    backoff: ExponentialBackoff,
}

impl CircuitBreakerTable {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let backoff = ExponentialBackoff::new(config.cooldown, config.max_cooldown);
        Self {
            circuits: RwLock::new(HashMap::new()),
            config,
            backoff,
        }
    }

    /// Non-mutating peek (§4.7 step 1 candidate filtering).
    pub fn would_allow(&self, node_id: &str) -> bool {
        let now = Instant::now();
        self.circuits
            .read()
            .unwrap()
            .get(node_id)
            .is_none_or(|c| c.would_allow(now))
    }

    /// `Allow(nodeId) -> (ok | openUntil)` (§4.6). Committing: transitions
    /// Open -> HalfOpen and reserves the single probe slot.
    pub fn allow(&self, node_id: &str) -> AllowDecision {
        let now = Instant::now();
        let mut circuits = self.circuits.write().unwrap();
        circuits.entry(node_id.to_string()).or_default().allow(now)
    }

    /// `OnSuccess(nodeId)` (§4.6): zeroes failures and closes.
    pub fn on_success(&self, node_id: &str) {
        let mut circuits = self.circuits.write().unwrap();
        circuits.entry(node_id.to_string()).or_default().on_success();
    }

    /// `OnFailure(nodeId)` (§4.6): increments; opens at threshold; re-opens
    /// with exponential backoff on a HalfOpen probe failure.
    pub fn on_failure(&self, node_id: &str) {
        let now = Instant::now();
        let mut circuits = self.circuits.write().unwrap();
        circuits.entry(node_id.to_string()).or_default().on_failure(
            now,
            self.config.failure_threshold,
            self.config.cooldown,
            &self.backoff,
        );
    }

    pub fn state(&self, node_id: &str) -> CircuitState {
        self.circuits
            .read()
            .unwrap()
            .get(node_id)
            .map(|c| c.snapshot().state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn snapshot(&self, node_id: &str) -> CircuitSnapshot {
        self.circuits
            .read()
            .unwrap()
            .get(node_id)
            .map(|c| c.snapshot())
            .unwrap_or(CircuitSnapshot {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                retry_at: None,
            })
    }

    /// Drops breakers that have sat Closed with zero failures, bounding
    /// memory for a churny node population (nodes that register once,
    /// drain, and never come back).
    pub fn remove_if_idle(&self, node_id: &str) {
        let mut circuits = self.circuits.write().unwrap();
        if let Some(circuit) = circuits.get(node_id) {
            let snapshot = circuit.snapshot();
            if snapshot.state == CircuitState::Closed && snapshot.consecutive_failures == 0 {
                circuits.remove(node_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(threshold: u32, cooldown_ms: u64) -> CircuitBreakerTable {
        CircuitBreakerTable::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_millis(cooldown_ms),
            max_cooldown: Duration::from_millis(cooldown_ms * 100),
        })
    }

    #[test]
    fn closed_by_default_and_allows() {
        let t = table(3, 1000);
        assert!(t.allow("n1").is_ok());
        assert_eq!(t.state("n1"), CircuitState::Closed);
    }

    #[test]
    fn scenario_3_opens_after_threshold_failures() {
        let t = table(3, 1000);
        t.on_failure("n1");
        t.on_failure("n1");
        assert_eq!(t.state("n1"), CircuitState::Closed);
        t.on_failure("n1");
        assert_eq!(t.state("n1"), CircuitState::Open);
        assert!(!t.allow("n1").is_ok());
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let t = table(1, 10);
        t.on_failure("n1");
        assert_eq!(t.state("n1"), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(20));
        assert!(t.allow("n1").is_ok(), "first probe after cooldown is admitted");
        assert_eq!(t.state("n1"), CircuitState::HalfOpen);
        assert!(
            !t.allow("n1").is_ok(),
            "a second concurrent probe must be refused while one is outstanding"
        );
    }

    #[test]
    fn half_open_success_closes() {
        let t = table(1, 10);
        t.on_failure("n1");
        std::thread::sleep(Duration::from_millis(20));
        t.allow("n1");
        t.on_success("n1");
        assert_eq!(t.state("n1"), CircuitState::Closed);
        assert!(t.allow("n1").is_ok());
    }

    #[test]
    fn half_open_failure_reopens_with_growing_backoff() {
        let t = table(1, 10);
        t.on_failure("n1");
        std::thread::sleep(Duration::from_millis(20));
        t.allow("n1");
        t.on_failure("n1");
        let first_retry = t.snapshot("n1").retry_at.unwrap();

        std::thread::sleep(Duration::from_millis(20));
        t.allow("n1");
        t.on_failure("n1");
        let second_retry = t.snapshot("n1").retry_at.unwrap();

        assert!(second_retry > first_retry);
    }

    #[test]
    fn would_allow_does_not_reserve_the_probe() {
        let t = table(1, 10);
        t.on_failure("n1");
        std::thread::sleep(Duration::from_millis(20));
        assert!(t.would_allow("n1"));
        assert!(t.would_allow("n1"), "peeking must not consume the slot");
        assert!(t.allow("n1").is_ok());
    }
}
