//! Exponential backoff for repeated HalfOpen failures (§4.6 "exponential
//! backoff capped at a maximum").
//!
//! Grounded on the teacher's `tower-retry-plus::backoff::ExponentialBackoff`
//! (`initial_interval * multiplier.powi(attempt)`, capped by `max_interval`);
//! reused here for the breaker's re-open cooldown instead of a retry delay.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max,
        }
    }

    /// `attempt` is 0-indexed: the first re-open uses `initial` unscaled.
    pub fn cooldown_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_then_caps() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(backoff.cooldown_for(0), Duration::from_secs(1));
        assert_eq!(backoff.cooldown_for(1), Duration::from_secs(2));
        assert_eq!(backoff.cooldown_for(2), Duration::from_secs(4));
        assert_eq!(backoff.cooldown_for(10), Duration::from_secs(10));
    }
}
