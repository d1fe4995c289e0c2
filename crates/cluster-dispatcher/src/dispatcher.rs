//! The Dispatcher (§4.7): selects a live node, forwards the request,
//! retries on peer failure, and surfaces a structured [`ClusterError`] when
//! no node can serve it.

use crate::body::{into_reqwest_body, RequestBody};
use crate::candidate::{admitted_candidates, Candidate};
use crate::cursor::Cursor;
use crate::headers::{forwarding_headers, served_by, strip_hop_by_hop};
use cluster_circuitbreaker::{AllowDecision, CircuitBreakerTable};
use cluster_core::ClusterError;
use cluster_registry::Registry;
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Everything the gateway has already extracted from the inbound request by
/// the time it reaches the dispatcher (§4.7 steps 4-5).
pub struct OutboundRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub client_ip: Option<String>,
    pub forwarded_proto: String,
    pub forwarded_host: String,
}

pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Extra attempts beyond the first, for a replayable body (§4.7 step 7
    /// "default <= 1 retry").
    pub max_retries: u32,
    pub request_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    circuits: Arc<CircuitBreakerTable>,
    cursor: Cursor,
    client: reqwest::Client,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        circuits: Arc<CircuitBreakerTable>,
        client: reqwest::Client,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            circuits,
            cursor: Cursor::new(),
            client,
            config,
        }
    }

    /// `Forward(request) -> response | ClusterError` (§4.7).
    pub async fn forward(&self, request: OutboundRequest) -> Result<ForwardedResponse, ClusterError> {
        let replayable = request.body.is_replayable();
        let max_attempts = if replayable { self.config.max_retries + 1 } else { 1 };
        let mut excluded: Vec<String> = Vec::new();
        let mut saw_transport_failure = false;

        for attempt in 0..max_attempts {
            let node = match self.pick_node(&excluded) {
                Some(node) => node,
                None => return Err(ClusterError::region_unavailable("all")),
            };

            match self.send_once(&node, &request).await {
                Ok(response) if response.status.as_u16() < 500 => {
                    self.circuits.on_success(&node.node_id);
                    return Ok(response);
                }
                Ok(response) => {
                    tracing::warn!(node_id = %node.node_id, status = %response.status, "peer returned 5xx");
                    self.circuits.on_failure(&node.node_id);
                    saw_transport_failure = true;
                    excluded.push(node.node_id);
                }
                Err(error) => {
                    tracing::warn!(node_id = %node.node_id, %error, "peer request failed");
                    self.circuits.on_failure(&node.node_id);
                    saw_transport_failure = true;
                    excluded.push(node.node_id);
                }
            }

            if attempt + 1 >= max_attempts {
                break;
            }
            if !replayable {
                break;
            }
        }

        if saw_transport_failure {
            Err(ClusterError::bad_gateway(
                "upstream node(s) failed to serve the request",
            ))
        } else {
            Err(ClusterError::region_unavailable("all"))
        }
    }

    /// Picks the next candidate via round robin, skipping any node whose
    /// circuit lost the admission race between the peek and the commit
    /// (§5: at most one HalfOpen probe outstanding per node).
    fn pick_node(&self, excluded: &[String]) -> Option<Candidate> {
        let mut candidates: Vec<Candidate> = admitted_candidates(&self.registry, &self.circuits)
            .into_iter()
            .filter(|c| !excluded.contains(&c.node_id))
            .collect();

        while !candidates.is_empty() {
            let idx = self.cursor.next(candidates.len());
            let candidate = candidates[idx].clone();
            match self.circuits.allow(&candidate.node_id) {
                AllowDecision::Ok => return Some(candidate),
                AllowDecision::OpenUntil(_) => {
                    candidates.remove(idx);
                }
            }
        }
        None
    }

    async fn send_once(
        &self,
        node: &Candidate,
        request: &OutboundRequest,
    ) -> Result<ForwardedResponse, reqwest::Error> {
        let url = format!("{}{}", node.address.trim_end_matches('/'), request.path_and_query);

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        for (name, value) in forwarding_headers(
            request.client_ip.as_deref(),
            &request.forwarded_proto,
            &request.forwarded_host,
        ) {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }

        let body = clone_or_take(&request.body);
        let outbound_body = into_reqwest_body(body);

        let response = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers)
            .timeout(self.config.request_timeout)
            .body(outbound_body)
            .send()
            .await?;

        let status = response.status();
        let mut response_headers = response.headers().clone();
        strip_hop_by_hop(&mut response_headers);
        let (name, value) = served_by(&node.node_id);
        response_headers.insert(name, value);
        let body = response.bytes().await?;

        Ok(ForwardedResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// Buffered bodies are resent verbatim on retry (cheap `Bytes` clone);
/// streaming bodies were already disqualified from retry, so this is only
/// ever called once per request in that case.
fn clone_or_take(body: &RequestBody) -> RequestBody {
    match body {
        RequestBody::Empty => RequestBody::Empty,
        RequestBody::Buffered(bytes) => RequestBody::Buffered(bytes.clone()),
        RequestBody::Streaming(_) => {
            unreachable!("streaming bodies are single-attempt and never retried")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_circuitbreaker::CircuitBreakerConfig;
    use cluster_registry::{NodeRegistration, Registry};
    use http::header::HeaderMap;
    use std::collections::BTreeSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn register(registry: &Registry, node_id: &str, address: &str) {
        registry
            .register(NodeRegistration {
                node_id: node_id.to_string(),
                display_name: node_id.to_string(),
                address: address.to_string(),
                capabilities: BTreeSet::new(),
                cores: 4,
                memory_bytes: 8 * 1024 * 1024 * 1024,
                max_jobs: 10,
                version: "1.0.0".to_string(),
                owner_token: "tok".to_string(),
            })
            .unwrap();
    }

    fn request() -> OutboundRequest {
        OutboundRequest {
            method: Method::GET,
            path_and_query: "/work".to_string(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            client_ip: Some("10.0.0.1".to_string()),
            forwarded_proto: "http".to_string(),
            forwarded_host: "gateway.local".to_string(),
        }
    }

    #[tokio::test]
    async fn round_robins_across_nodes_in_node_id_order() {
        let server_a = MockServer::start().await;
        let server_b = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .mount(&server_a)
            .await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b"))
            .mount(&server_b)
            .await;

        let registry = Arc::new(Registry::new(Duration::from_secs(30)));
        register(&registry, "node-a", &server_a.uri());
        register(&registry, "node-b", &server_b.uri());
        let circuits = Arc::new(CircuitBreakerTable::new(CircuitBreakerConfig::default()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&circuits),
            reqwest::Client::new(),
            DispatcherConfig::default(),
        );

        let mut bodies = Vec::new();
        for _ in 0..4 {
            let response = dispatcher.forward(request()).await.unwrap();
            bodies.push(String::from_utf8(response.body.to_vec()).unwrap());
        }
        assert_eq!(bodies, vec!["a", "b", "a", "b"]);
    }

    #[tokio::test]
    async fn fails_over_to_the_next_node_on_5xx() {
        let flaky = MockServer::start().await;
        let healthy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&flaky)
            .await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&healthy)
            .await;

        let registry = Arc::new(Registry::new(Duration::from_secs(30)));
        register(&registry, "node-flaky", &flaky.uri());
        register(&registry, "node-healthy", &healthy.uri());
        let circuits = Arc::new(CircuitBreakerTable::new(CircuitBreakerConfig::default()));
        let dispatcher = Dispatcher::new(
            registry,
            circuits,
            reqwest::Client::new(),
            DispatcherConfig::default(),
        );

        let response = dispatcher.forward(request()).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(String::from_utf8(response.body.to_vec()).unwrap(), "ok");
    }

    #[tokio::test]
    async fn returns_bad_gateway_when_every_node_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/work"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = Arc::new(Registry::new(Duration::from_secs(30)));
        register(&registry, "node-a", &server.uri());
        let circuits = Arc::new(CircuitBreakerTable::new(CircuitBreakerConfig::default()));
        let dispatcher = Dispatcher::new(
            registry,
            circuits,
            reqwest::Client::new(),
            DispatcherConfig {
                max_retries: 0,
                ..DispatcherConfig::default()
            },
        );

        let error = dispatcher.forward(request()).await.unwrap_err();
        assert_eq!(error.kind, cluster_core::ClusterErrorKind::BadGateway);
    }

    #[tokio::test]
    async fn region_unavailable_when_no_node_is_registered() {
        let registry = Arc::new(Registry::new(Duration::from_secs(30)));
        let circuits = Arc::new(CircuitBreakerTable::new(CircuitBreakerConfig::default()));
        let dispatcher = Dispatcher::new(
            registry,
            circuits,
            reqwest::Client::new(),
            DispatcherConfig::default(),
        );

        let error = dispatcher.forward(request()).await.unwrap_err();
        assert_eq!(error.kind, cluster_core::ClusterErrorKind::RegionUnavailable);
    }
}
