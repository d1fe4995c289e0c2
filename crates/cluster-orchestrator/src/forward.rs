//! The catch-all route (§4.8): every request that isn't one of the control
//! endpoints passes through the Gateway, which decides whether to forward
//! it to the cluster or (when not overloaded) let it fall through to
//! whatever local application router this process would otherwise run.
//! This control-plane binary doesn't itself carry application business
//! logic, so a `Local` admission here has no further handler to hand off
//! to and reports as much rather than silently 200ing.

use crate::core::Core;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use cluster_core::ClusterError;
use cluster_dispatcher::Admission;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn forward(
    State(core): State<Arc<Core>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ClusterError> {
    let content_length = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| peer.ip().to_string());

    let forwarded_host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let rate_limit_key = client_ip.clone();

    let admission = core
        .gateway
        .admit(
            method,
            path_and_query,
            headers,
            body,
            content_length,
            Some(client_ip),
            "http".to_string(),
            forwarded_host,
            &rate_limit_key,
        )
        .await?;

    match admission {
        Admission::Local => Ok((
            StatusCode::NOT_FOUND,
            "no local application handler is mounted on the orchestration core",
        )
            .into_response()),
        Admission::Forwarded(response) => {
            let mut builder = Response::builder().status(response.status);
            if let Some(headers_mut) = builder.headers_mut() {
                *headers_mut = response.headers;
            }
            Ok(builder
                .body(Body::from(response.body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
        }
    }
}
