//! Bearer-token auth for the control endpoints (§6: `Authorization: Bearer
//! <clusterToken>` matching the process secret).

use crate::core::Core;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use cluster_core::ClusterError;
use std::sync::Arc;

pub async fn require_cluster_token(
    State(core): State<Arc<Core>>,
    request: Request,
    next: Next,
) -> Result<Response, ClusterError> {
    let presented = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == core.config.cluster_token => Ok(next.run(request).await),
        _ => Err(ClusterError::auth_failed(
            "missing or invalid cluster bearer token",
        )),
    }
}
