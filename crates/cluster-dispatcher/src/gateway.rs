//! The Gateway (§4.8): the inbound admission pipeline that decides whether a
//! request is served locally, forwarded to the cluster, or rejected, then
//! hands off to the [`Dispatcher`].

use crate::body::prepare_body;
use crate::dispatcher::{Dispatcher, ForwardedResponse, OutboundRequest};
use cluster_core::ClusterError;
use cluster_loadmonitor::{LoadMonitor, Sampler};
use cluster_ratelimiter::RateLimiter;
use http::Method;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A request is served locally, bypassing the cluster entirely, when its
/// path matches one of these (health checks, metrics scrapes, etc.) — §4.8
/// "local bypass path list".
#[derive(Debug, Clone, Default)]
pub struct LocalBypassPaths(BTreeSet<String>);

impl LocalBypassPaths {
    pub fn new(paths: impl IntoIterator<Item = String>) -> Self {
        Self(paths.into_iter().collect())
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.contains(path)
    }
}

pub struct GatewayConfig {
    pub bypass_paths: LocalBypassPaths,
    pub max_replay_bytes: usize,
    /// `FORWARDING_ORCHESTRATOR` (§6): forces forwarding regardless of local
    /// load.
    pub orchestrator_mode: bool,
}

pub enum Admission {
    /// The request never leaves this process (§4.8 step 1).
    Local,
    Forwarded(ForwardedResponse),
}

/// Ties the load monitor, rate limiter and dispatcher together into the
/// admission decision described in §4.8:
/// 1. local bypass paths are served locally;
/// 2. otherwise forward only when `orchestrator_mode` is set or the local
///    node is overloaded;
/// 3. otherwise admit into the rate limiter, rejecting on denial;
/// 4. hand off to the dispatcher.
pub struct Gateway<S: Sampler> {
    load_monitor: Arc<LoadMonitor<S>>,
    rate_limiter: Arc<RateLimiter>,
    dispatcher: Dispatcher,
    config: GatewayConfig,
}

impl<S: Sampler> Gateway<S> {
    pub fn new(
        load_monitor: Arc<LoadMonitor<S>>,
        rate_limiter: Arc<RateLimiter>,
        dispatcher: Dispatcher,
        config: GatewayConfig,
    ) -> Self {
        Self {
            load_monitor,
            rate_limiter,
            dispatcher,
            config,
        }
    }

    pub fn should_serve_locally(&self, path_and_query: &str) -> bool {
        let path = path_and_query.split('?').next().unwrap_or(path_and_query);
        self.config.bypass_paths.matches(path)
    }

    /// `Admit(request)` (§4.8). `rate_limit_key` identifies the caller for
    /// rate-limiting purposes (typically the client IP or an API key); the
    /// caller extracts it from whatever auth/transport layer sits above this.
    pub async fn admit(
        &self,
        method: Method,
        path_and_query: String,
        headers: http::HeaderMap,
        body: axum::body::Body,
        content_length: Option<u64>,
        client_ip: Option<String>,
        forwarded_proto: String,
        forwarded_host: String,
        rate_limit_key: &str,
    ) -> Result<Admission, ClusterError> {
        if self.should_serve_locally(&path_and_query) {
            return Ok(Admission::Local);
        }

        if !self.config.orchestrator_mode && !self.load_monitor.should_forward() {
            return Ok(Admission::Local);
        }

        self.rate_limiter.consume_or_reject(rate_limit_key, None)?;

        let prepared_body = prepare_body(
            &method,
            body,
            content_length,
            self.config.max_replay_bytes,
        )
        .await
        .map_err(|error| {
            let correlation_id = cluster_core::correlation_id();
            tracing::error!(%correlation_id, %error, "failed to read inbound request body");
            ClusterError::internal(correlation_id)
        })?;

        let outbound = OutboundRequest {
            method,
            path_and_query,
            headers,
            body: prepared_body,
            client_ip,
            forwarded_proto,
            forwarded_host,
        };

        let response = self.dispatcher.forward(outbound).await?;
        Ok(Admission::Forwarded(response))
    }
}
