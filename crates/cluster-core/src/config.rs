//! Process configuration, loaded once at startup from environment-style keys
//! (§6). Every default listed in the specification is reproduced here; the
//! remaining fields are the ambient defaults a real deployment needs that the
//! distilled spec doesn't assign an explicit key to (documented per-field).

use serde::Deserialize;
use std::env::VarError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for environment variable {key}: {source}")]
    Invalid {
        key: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One entry of the `RATE_LIMIT_RULES` JSON array (§3, §6). Kept here (rather
/// than in `cluster-ratelimiter`) so parsing the environment doesn't require
/// a dependency cycle; `cluster-ratelimiter::RateLimitRule` is constructed
/// from this at wiring time.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRateLimitRule {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    #[serde(rename = "keyPattern", default)]
    pub key_pattern: Option<String>,
    #[serde(rename = "maxRequests")]
    pub max_requests: u64,
    #[serde(rename = "windowMs")]
    pub window_ms: u64,
    #[serde(rename = "hardLimit", default)]
    pub hard_limit: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub heartbeat_interval: Duration,
    pub node_timeout: Duration,
    pub max_jobs_per_node: u32,
    /// `FORWARDING_ORCHESTRATOR` — forces orchestrator mode even when the
    /// local load monitor reports no overload. The historical deployment
    /// recognized a misspelled `FORWARDING_ORCHESTRER`; that spelling is
    /// documented here for operators migrating old env files but is never
    /// read (§9 Open Question: preserve the current key exactly).
    pub orchestrator_mode: bool,
    pub cluster_token: String,
    pub rate_limit_rules: Vec<RawRateLimitRule>,
    pub ram_threshold_pct: f64,
    pub cpu_threshold_pct: f64,
    /// Supplementary: caps the dispatcher's retry-replay buffer (§4.7, §9).
    /// Not an explicit env key in spec.md; added as ambient configuration so
    /// the limit is tunable rather than hardcoded.
    pub max_replay_bytes: usize,
    /// Supplementary: per-node bounded history length (§3 "default 360").
    pub metrics_history_per_node: usize,
    /// Supplementary: circuit breaker tuning, not named as env keys in
    /// spec.md but required to construct `cluster-circuitbreaker::Table`.
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
    pub circuit_max_cooldown: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_env_or("PORT", 8080)?,
            heartbeat_interval: Duration::from_millis(parse_env_or(
                "CLUSTER_HEARTBEAT_INTERVAL_MS",
                10_000,
            )?),
            node_timeout: Duration::from_millis(parse_env_or("CLUSTER_NODE_TIMEOUT_MS", 30_000)?),
            max_jobs_per_node: parse_env_or("CLUSTER_MAX_JOBS_PER_NODE", 4)?,
            orchestrator_mode: parse_bool_env_or("FORWARDING_ORCHESTRATOR", false)?,
            cluster_token: require_env("CLUSTER_TOKEN")?,
            rate_limit_rules: parse_json_env_or("RATE_LIMIT_RULES", Vec::new())?,
            ram_threshold_pct: parse_env_or("RAM_THRESHOLD_PCT", 90.0)?,
            cpu_threshold_pct: parse_env_or("CPU_THRESHOLD_PCT", 100.0)?,
            max_replay_bytes: parse_env_or("CLUSTER_MAX_REPLAY_BYTES", 64 * 1024)?,
            metrics_history_per_node: parse_env_or("CLUSTER_METRICS_HISTORY_SIZE", 360)?,
            circuit_failure_threshold: parse_env_or("CLUSTER_CB_FAILURE_THRESHOLD", 5)?,
            circuit_cooldown: Duration::from_millis(parse_env_or(
                "CLUSTER_CB_COOLDOWN_MS",
                30_000,
            )?),
            circuit_max_cooldown: Duration::from_millis(parse_env_or(
                "CLUSTER_CB_MAX_COOLDOWN_MS",
                300_000,
            )?),
        })
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Err(ConfigError::Missing(key)),
        Err(source) => Err(ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
    }
}

fn parse_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|source| ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(source) => Err(ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
    }
}

fn parse_bool_env_or(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                source: format!("cannot parse '{raw}' as a boolean").into(),
            }),
        },
        Err(VarError::NotPresent) => Ok(default),
        Err(source) => Err(ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
    }
}

fn parse_json_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    match std::env::var(key) {
        Ok(raw) => serde_json::from_str(&raw).map_err(|source| ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(source) => Err(ConfigError::Invalid {
            key,
            source: Box::new(source),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in [
            "PORT",
            "CLUSTER_HEARTBEAT_INTERVAL_MS",
            "CLUSTER_NODE_TIMEOUT_MS",
            "CLUSTER_MAX_JOBS_PER_NODE",
            "FORWARDING_ORCHESTRATOR",
            "RATE_LIMIT_RULES",
            "RAM_THRESHOLD_PCT",
            "CPU_THRESHOLD_PCT",
        ] {
            std::env::remove_var(key);
        }
        std::env::set_var("CLUSTER_TOKEN", "test-token");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.heartbeat_interval, Duration::from_millis(10_000));
        assert_eq!(cfg.node_timeout, Duration::from_millis(30_000));
        assert_eq!(cfg.max_jobs_per_node, 4);
        assert!(!cfg.orchestrator_mode);
        assert_eq!(cfg.ram_threshold_pct, 90.0);
        assert_eq!(cfg.cpu_threshold_pct, 100.0);
        std::env::remove_var("CLUSTER_TOKEN");
    }

    #[test]
    fn missing_token_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("CLUSTER_TOKEN");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLUSTER_TOKEN")));
    }

    #[test]
    fn rate_limit_rules_parse_from_json() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("CLUSTER_TOKEN", "test-token");
        std::env::set_var(
            "RATE_LIMIT_RULES",
            r#"[{"ruleId":"r1","maxRequests":2,"windowMs":1000,"hardLimit":true}]"#,
        );
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.rate_limit_rules.len(), 1);
        assert_eq!(cfg.rate_limit_rules[0].rule_id, "r1");
        assert!(cfg.rate_limit_rules[0].hard_limit);
        std::env::remove_var("CLUSTER_TOKEN");
        std::env::remove_var("RATE_LIMIT_RULES");
    }
}
