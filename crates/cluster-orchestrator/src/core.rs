//! The process-wide `Core` (§9 "Global mutable state"): owns every
//! component and the background tasks that keep them fresh, and exposes the
//! single `Gateway` the HTTP layer calls into.

use crate::local_source::LocalSource;
use cluster_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerTable};
use cluster_core::{Config, TaskSupervisor};
use cluster_dispatcher::{Dispatcher, DispatcherConfig, Gateway, GatewayConfig, LocalBypassPaths};
use cluster_loadmonitor::{LoadMonitor, ProcSampler, Thresholds};
use cluster_metrics::{MetricsCollector, DEFAULT_COLLECTION_INTERVAL};
use cluster_ratelimiter::{RateLimitRule, RateLimiter};
use cluster_registry::Registry;
use cluster_resources::{RateCard, ResourceTracker};
use std::sync::Arc;
use std::time::Duration;

pub struct Core {
    pub registry: Arc<Registry>,
    pub metrics: Arc<MetricsCollector>,
    pub resources: Arc<ResourceTracker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub circuits: Arc<CircuitBreakerTable>,
    pub load_monitor: Arc<LoadMonitor<ProcSampler>>,
    pub gateway: Arc<Gateway<ProcSampler>>,
    pub config: Config,
}

impl Core {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(Registry::new(config.node_timeout));
        let metrics = Arc::new(MetricsCollector::new(
            "local",
            config.metrics_history_per_node.max(1),
        ));
        let resources = Arc::new(ResourceTracker::new(RateCard::default()));
        let rate_limiter = Arc::new(RateLimiter::new());
        for raw in &config.rate_limit_rules {
            rate_limiter.add_rule(RateLimitRule::from(raw.clone()));
        }
        let circuits = Arc::new(CircuitBreakerTable::new(CircuitBreakerConfig {
            failure_threshold: config.circuit_failure_threshold,
            cooldown: config.circuit_cooldown,
            max_cooldown: config.circuit_max_cooldown,
        }));
        let load_monitor = Arc::new(LoadMonitor::new(
            ProcSampler::new(),
            Thresholds {
                ram_pct: config.ram_threshold_pct,
                cpu_pct: config.cpu_threshold_pct,
            },
        ));

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&circuits),
            reqwest::Client::new(),
            DispatcherConfig::default(),
        );
        let gateway_config = GatewayConfig {
            bypass_paths: LocalBypassPaths::new([
                "/api/v1/clusters/register".to_string(),
                "/api/v1/clusters/heartbeat".to_string(),
                "/api/v1/health".to_string(),
                "/api/v1/health/ready".to_string(),
                "/api/v1/health/live".to_string(),
            ]),
            max_replay_bytes: config.max_replay_bytes,
            orchestrator_mode: config.orchestrator_mode,
        };
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&load_monitor),
            Arc::clone(&rate_limiter),
            dispatcher,
            gateway_config,
        ));

        Self {
            registry,
            metrics,
            resources,
            rate_limiter,
            circuits,
            load_monitor,
            gateway,
            config,
        }
    }

    /// Spawns every background task (§4.1 sweeper, §4.2 ticker, §4.5
    /// cleanup, local metrics collection) tracked by `supervisor` so
    /// `TaskSupervisor::shutdown` stops them all deterministically.
    pub fn start(&self, supervisor: &mut TaskSupervisor) {
        supervisor.track(cluster_registry::sweeper::spawn(
            Arc::clone(&self.registry),
            self.config.node_timeout / 2,
            supervisor.child_token(),
        ));

        let load_monitor = Arc::clone(&self.load_monitor);
        supervisor.track(cluster_loadmonitor::ticker::spawn(
            load_monitor,
            cluster_loadmonitor::DEFAULT_SAMPLE_INTERVAL,
            supervisor.child_token(),
        ));

        supervisor.track(cluster_ratelimiter::cleanup::spawn(
            Arc::clone(&self.rate_limiter),
            cluster_ratelimiter::DEFAULT_CLEANUP_INTERVAL,
            supervisor.child_token(),
        ));

        let metrics = Arc::clone(&self.metrics);
        let source = LocalSource::new(Arc::clone(&self.load_monitor));
        let shutdown = supervisor.child_token();
        supervisor.track(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DEFAULT_COLLECTION_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        metrics.record_local(&source);
                    }
                }
            }
        }));
    }

    pub fn supervisor_grace_period() -> Duration {
        Duration::from_secs(10)
    }
}
