//! The `Result` object `Check`/`Consume` return (§4.5). Kept as a named
//! struct rather than an anonymous tuple, matching the teacher's
//! `RateLimiterOutcome`-style result types.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests still permitted in the current window for the
    /// most-restrictive applicable rule. May be negative for a soft
    /// (non-hard) rule that has already been exceeded without blocking.
    pub remaining: i64,
    pub limit: u64,
    pub reset: Duration,
    /// Only meaningful when `allowed` is false.
    pub retry_after: Option<Duration>,
    pub rule_id: String,
}
