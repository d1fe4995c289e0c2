//! Rate Limiter (§4.5): sliding-window admission control keyed by an
//! arbitrary string, with multiple rules evaluated per check.
//!
//! The per-bucket bookkeeping is grounded directly on the teacher's
//! `tower-resilience-ratelimiter::limiter::SlidingLogState` (prune expired
//! entries from the front, then push the new one at the back), generalized
//! from one limiter instance to per-key buckets under an arbitrary rule set.

use crate::decision::RateLimitDecision;
use crate::rule::RateLimitRule;
use cluster_core::ClusterError;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct BucketKey {
    rule_id: String,
    key: String,
}

pub struct RateLimiter {
    rules: RwLock<HashMap<String, RateLimitRule>>,
    buckets: RwLock<HashMap<BucketKey, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// `AddRule(rule)` (§4.5).
    pub fn add_rule(&self, rule: RateLimitRule) {
        self.rules.write().unwrap().insert(rule.rule_id.clone(), rule);
    }

    /// `RemoveRule(id)` (§4.5).
    pub fn remove_rule(&self, rule_id: &str) {
        self.rules.write().unwrap().remove(rule_id);
        let mut buckets = self.buckets.write().unwrap();
        buckets.retain(|key, _| key.rule_id != rule_id);
    }

    fn applicable_rules(&self, rule_ids: Option<&[String]>) -> Vec<RateLimitRule> {
        let rules = self.rules.read().unwrap();
        match rule_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| rules.get(id).cloned())
                .collect(),
            None => rules.values().cloned().collect(),
        }
    }

    /// `Check(key, ruleIds?) -> Result{...}` (§4.5). Prunes each applicable
    /// rule's bucket, then:
    /// - if any checked rule is exceeded AND `hardLimit`, short-circuits
    ///   and returns that rule's decision;
    /// - otherwise returns the most-restrictive (smallest `remaining`)
    ///   decision among all checked rules.
    pub fn check(&self, key: &str, rule_ids: Option<&[String]>) -> RateLimitDecision {
        self.check_all(key, rule_ids).1
    }

    /// Evaluates every applicable rule and returns both the full per-rule
    /// breakdown and the winning decision, so `consume` can record against
    /// every rule that allowed the request rather than only the winner.
    fn check_all(
        &self,
        key: &str,
        rule_ids: Option<&[String]>,
    ) -> (Vec<RateLimitDecision>, RateLimitDecision) {
        let rules = self.applicable_rules(rule_ids);
        if rules.is_empty() {
            let unconstrained = RateLimitDecision {
                allowed: true,
                remaining: i64::MAX,
                limit: u64::MAX,
                reset: Duration::ZERO,
                retry_after: None,
                rule_id: String::new(),
            };
            return (Vec::new(), unconstrained);
        }

        let now = Instant::now();
        let mut decisions = Vec::with_capacity(rules.len());
        for rule in &rules {
            decisions.push(self.evaluate_rule(key, rule, now));
        }

        let winner = if let Some(hard) = decisions
            .iter()
            .find(|d| !d.allowed && rule_by_id(&rules, &d.rule_id).map(|r| r.hard_limit) == Some(true))
        {
            hard.clone()
        } else {
            decisions
                .iter()
                .min_by_key(|d| d.remaining)
                .cloned()
                .expect("rules is non-empty")
        };

        (decisions, winner)
    }

    /// `Record(key, ruleId)` (§4.5): appends `now` to the bucket.
    pub fn record(&self, key: &str, rule_id: &str) {
        let bucket_key = BucketKey {
            rule_id: rule_id.to_string(),
            key: key.to_string(),
        };
        self.buckets
            .write()
            .unwrap()
            .entry(bucket_key)
            .or_insert_with(VecDeque::new)
            .push_back(Instant::now());
    }

    /// `Consume(key, ruleId?)` (§4.5): `Check` then, if allowed, `Record`
    /// against every applicable rule that allowed the request — not just
    /// the most-restrictive winner — so looser rules' buckets still
    /// accumulate and can eventually trigger on their own.
    pub fn consume(&self, key: &str, rule_ids: Option<&[String]>) -> RateLimitDecision {
        let (decisions, winner) = self.check_all(key, rule_ids);
        for decision in &decisions {
            if decision.allowed && !decision.rule_id.is_empty() {
                self.record(key, &decision.rule_id);
            }
        }
        winner
    }

    /// Convenience wrapper returning a `ClusterError` on denial, for the
    /// Gateway's admission path (§4.8).
    pub fn consume_or_reject(
        &self,
        key: &str,
        rule_ids: Option<&[String]>,
    ) -> Result<RateLimitDecision, ClusterError> {
        let decision = self.consume(key, rule_ids);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(ClusterError::rate_limited(
                decision.rule_id.clone(),
                decision.retry_after.unwrap_or(decision.reset),
            ))
        }
    }

    fn evaluate_rule(&self, key: &str, rule: &RateLimitRule, now: Instant) -> RateLimitDecision {
        let bucket_key = BucketKey {
            rule_id: rule.rule_id.clone(),
            key: key.to_string(),
        };
        let mut buckets = self.buckets.write().unwrap();
        let bucket = buckets.entry(bucket_key).or_insert_with(VecDeque::new);
        while let Some(&front) = bucket.front() {
            if now.duration_since(front) >= rule.window {
                bucket.pop_front();
            } else {
                break;
            }
        }
        let count = bucket.len() as u64;
        // Soft rules report the overage via a negative `remaining` but never
        // deny the request themselves (§4.5, §4.8) — only a hard rule's
        // denial can reject at the gateway.
        let allowed = count < rule.max_requests || !rule.hard_limit;
        let remaining = rule.max_requests as i64 - count as i64;
        let reset = bucket
            .front()
            .map(|&oldest| {
                let elapsed = now.duration_since(oldest);
                rule.window.saturating_sub(elapsed)
            })
            .unwrap_or(Duration::ZERO);
        RateLimitDecision {
            allowed,
            remaining,
            limit: rule.max_requests,
            reset,
            retry_after: if allowed { None } else { Some(reset) },
            rule_id: rule.rule_id.clone(),
        }
    }

    /// Periodic background cleanup: drops empty buckets so memory doesn't
    /// grow unbounded with one-shot keys (§4.5).
    pub fn cleanup_empty_buckets(&self) {
        let now = Instant::now();
        let rules = self.rules.read().unwrap();
        let mut buckets = self.buckets.write().unwrap();
        buckets.retain(|bucket_key, timestamps| {
            if let Some(rule) = rules.get(&bucket_key.rule_id) {
                timestamps.retain(|&ts| now.duration_since(ts) < rule.window);
            }
            !timestamps.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn rule_by_id<'a>(rules: &'a [RateLimitRule], rule_id: &str) -> Option<&'a RateLimitRule> {
    rules.iter().find(|r| r.rule_id == rule_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_hard_limit_denies_third_call() {
        let limiter = RateLimiter::new();
        limiter.add_rule(
            RateLimitRule::new("r1", 2, Duration::from_millis(1000)).with_hard_limit(true),
        );
        let a = limiter.consume("u1", None);
        let b = limiter.consume("u1", None);
        let c = limiter.consume("u1", None);
        assert!(a.allowed);
        assert!(b.allowed);
        assert!(!c.allowed);
        assert_eq!(c.rule_id, "r1");
        // retryAfterMs should be well under the full window since two of
        // the three calls already happened.
        assert!(c.retry_after.unwrap() <= Duration::from_millis(1000));
    }

    #[test]
    fn soft_limit_does_not_block() {
        let limiter = RateLimiter::new();
        limiter.add_rule(RateLimitRule::new("soft", 1, Duration::from_secs(1)));
        let a = limiter.consume("u1", None);
        let b = limiter.consume("u1", None);
        assert!(a.allowed);
        assert!(b.allowed, "soft limit must never deny");
    }

    #[test]
    fn most_restrictive_rule_wins_when_multiple_apply() {
        let limiter = RateLimiter::new();
        limiter.add_rule(RateLimitRule::new("loose", 100, Duration::from_secs(1)));
        limiter.add_rule(RateLimitRule::new("tight", 1, Duration::from_secs(1)));
        let decision = limiter.check("u1", None);
        assert_eq!(decision.rule_id, "tight");
    }

    #[test]
    fn bucket_is_empty_after_window_elapses() {
        let limiter = RateLimiter::new();
        limiter.add_rule(
            RateLimitRule::new("r1", 1, Duration::from_millis(20)).with_hard_limit(true),
        );
        assert!(limiter.consume("u1", None).allowed);
        assert!(!limiter.consume("u1", None).allowed);
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.consume("u1", None).allowed);
    }

    #[test]
    fn remove_rule_drops_its_buckets() {
        let limiter = RateLimiter::new();
        limiter.add_rule(RateLimitRule::new("r1", 1, Duration::from_secs(1)));
        limiter.consume("u1", None);
        limiter.remove_rule("r1");
        // No rules left means the limiter admits unconditionally.
        let decision = limiter.check("u1", None);
        assert!(decision.allowed);
    }

    proptest::proptest! {
        #[test]
        fn sliding_window_never_retains_more_than_max(max in 1u64..10, attempts in 0usize..50) {
            let limiter = RateLimiter::new();
            limiter.add_rule(RateLimitRule::new("r1", max, Duration::from_secs(60)).with_hard_limit(true));
            let mut allowed_count = 0u64;
            for _ in 0..attempts {
                if limiter.consume("k", None).allowed {
                    allowed_count += 1;
                }
            }
            prop_assert!(allowed_count <= max);
        }
    }
}
