//! Reference worker-node HTTP surface (§4.10, §6 "Cluster node worker
//! endpoints"): `GET /health`, `GET /stats`, `POST /execute`. A real worker
//! node is a separate deployable; this binary is a minimal stand-in so the
//! dispatcher's retry/failover paths have something real to drive against
//! in integration tests, mirroring the teacher's pattern of shipping
//! runnable example binaries alongside each pattern crate.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

struct SimState {
    max_jobs: u32,
    active_jobs: AtomicU32,
    executed: AtomicU64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let max_jobs: u32 = std::env::var("SIM_MAX_JOBS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let port: u16 = std::env::var("SIM_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(9000);

    let state = Arc::new(SimState {
        max_jobs,
        active_jobs: AtomicU32::new(0),
        executed: AtomicU64::new(0),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/execute", post(execute))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind error");
    tracing::info!(%addr, "cluster-node-sim listening");
    axum::serve(listener, app).await.expect("server error");
}

async fn health(State(state): State<Arc<SimState>>) -> impl IntoResponse {
    let active = state.active_jobs.load(Ordering::Relaxed);
    Json(serde_json::json!({
        "status": "ok",
        "activeJobs": active,
        "maxJobs": state.max_jobs,
        "hasCapacity": active < state.max_jobs,
    }))
}

async fn stats(State(state): State<Arc<SimState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "activeJobs": state.active_jobs.load(Ordering::Relaxed),
        "executed": state.executed.load(Ordering::Relaxed),
    }))
}

#[derive(Deserialize)]
struct ExecuteRequest {
    #[serde(rename = "workflowId")]
    workflow_id: String,
    #[serde(default)]
    spec: serde_json::Value,
    #[serde(default)]
    limits: serde_json::Value,
    #[serde(rename = "repositoryUrl", default)]
    repository_url: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    env: serde_json::Value,
}

/// `POST /execute` (§6): 202 on accept, 503 when at capacity.
async fn execute(
    State(state): State<Arc<SimState>>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    let _ = (&request.spec, &request.limits, &request.env, &request.branch, &request.repository_url);
    let active = state.active_jobs.fetch_add(1, Ordering::Relaxed) + 1;
    if active > state.max_jobs {
        state.active_jobs.fetch_sub(1, Ordering::Relaxed);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "at capacity" })),
        );
    }
    state.executed.fetch_add(1, Ordering::Relaxed);
    state.active_jobs.fetch_sub(1, Ordering::Relaxed);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true, "workflowId": request.workflow_id })),
    )
}
