//! Rate-limit rule configuration (§3).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pub rule_id: String,
    /// Informational only — not matched against keys by this crate; callers
    /// decide which rules apply to a given key (§4.5 `Check(key, ruleIds?)`).
    pub key_pattern: Option<String>,
    pub max_requests: u64,
    pub window: Duration,
    pub hard_limit: bool,
}

impl RateLimitRule {
    pub fn new(rule_id: impl Into<String>, max_requests: u64, window: Duration) -> Self {
        Self {
            rule_id: rule_id.into(),
            key_pattern: None,
            max_requests,
            window,
            hard_limit: false,
        }
    }

    pub fn with_hard_limit(mut self, hard_limit: bool) -> Self {
        self.hard_limit = hard_limit;
        self
    }

    pub fn with_key_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.key_pattern = Some(pattern.into());
        self
    }
}

impl From<cluster_core::RawRateLimitRule> for RateLimitRule {
    fn from(raw: cluster_core::RawRateLimitRule) -> Self {
        Self {
            rule_id: raw.rule_id,
            key_pattern: raw.key_pattern,
            max_requests: raw.max_requests,
            window: Duration::from_millis(raw.window_ms),
            hard_limit: raw.hard_limit,
        }
    }
}
