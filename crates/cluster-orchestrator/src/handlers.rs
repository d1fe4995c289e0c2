//! Control endpoint handlers (§6): register, heartbeat, health. These are
//! always served locally — the Gateway's bypass-path list keeps them from
//! ever reaching the dispatcher.

use crate::core::Core;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use cluster_core::ClusterError;
use cluster_metrics::{LoadAverage, MetricSnapshot};
use cluster_registry::{HeartbeatStats, NodeRegistration};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "nodeId")]
    node_id: String,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    address: String,
    cores: u32,
    #[serde(rename = "memoryBytes")]
    memory_bytes: u64,
    #[serde(rename = "maxJobs")]
    max_jobs: u32,
    #[serde(default)]
    capabilities: BTreeSet<String>,
    version: String,
    token: String,
}

/// `POST /api/v1/clusters/register` (§6). Auth is checked by the caller
/// against `Authorization: Bearer <clusterToken>` before this runs; `token`
/// in the body is the node's own ownership credential (§4.1), a distinct
/// concept from the cluster-wide bearer token.
pub async fn register(
    State(core): State<Arc<Core>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ClusterError> {
    let node_id = request.node_id.clone();
    core.registry.register(NodeRegistration {
        node_id: node_id.clone(),
        display_name: request.display_name.unwrap_or_else(|| node_id.clone()),
        address: request.address,
        capabilities: request.capabilities,
        cores: request.cores,
        memory_bytes: request.memory_bytes,
        max_jobs: request.max_jobs,
        version: request.version,
        owner_token: request.token,
    })?;
    Ok(Json(serde_json::json!({
        "accepted": true,
        "nodeId": node_id,
    })))
}

#[derive(Deserialize)]
pub struct HeartbeatRequest {
    #[serde(rename = "nodeId")]
    node_id: String,
    #[serde(rename = "cpuUsage")]
    cpu_usage: f64,
    #[serde(rename = "memoryUsage")]
    memory_usage: f64,
    #[serde(rename = "memoryUsedBytes", default)]
    memory_used_bytes: u64,
    #[serde(rename = "memoryTotalBytes", default)]
    memory_total_bytes: u64,
    #[serde(rename = "loadAvg", default)]
    load_avg: Option<LoadAvgPayload>,
    #[serde(rename = "activeJobs")]
    active_jobs: u32,
    #[serde(rename = "completedJobs", default)]
    completed_jobs: u64,
    #[serde(rename = "failedJobs", default)]
    failed_jobs: u64,
    #[serde(rename = "uptimeSeconds", default)]
    uptime_seconds: u64,
}

#[derive(Deserialize, Default)]
pub struct LoadAvgPayload {
    #[serde(default)]
    one: f64,
    #[serde(default)]
    five: f64,
    #[serde(default)]
    fifteen: f64,
}

pub const HEARTBEAT_INTERVAL_HINT_MS: u64 = 10_000;

/// `POST /api/v1/clusters/heartbeat` (§6): refreshes registry liveness and
/// ingests the reporting node's metric snapshot for cluster aggregation.
pub async fn heartbeat(
    State(core): State<Arc<Core>>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<impl IntoResponse, ClusterError> {
    core.registry.heartbeat(
        &request.node_id,
        HeartbeatStats {
            active_jobs: request.active_jobs,
            cpu_usage_pct: request.cpu_usage,
            memory_usage_pct: request.memory_usage,
        },
    )?;

    let load_avg = request.load_avg.unwrap_or_default();
    core.metrics.ingest(
        request.node_id,
        MetricSnapshot {
            cpu_usage: request.cpu_usage,
            memory_usage: request.memory_usage,
            memory_used_bytes: request.memory_used_bytes,
            memory_total_bytes: request.memory_total_bytes,
            load_avg: LoadAverage {
                one: load_avg.one,
                five: load_avg.five,
                fifteen: load_avg.fifteen,
            },
            active_jobs: request.active_jobs,
            completed_jobs: request.completed_jobs,
            failed_jobs: request.failed_jobs,
            uptime: Duration::from_secs(request.uptime_seconds),
            collected_at: SystemTime::now(),
        },
    );

    Ok(Json(serde_json::json!({
        "ack": true,
        "next_interval_ms": HEARTBEAT_INTERVAL_HINT_MS,
    })))
}

/// `GET /api/v1/health` (§6): aggregate cluster status.
pub async fn health(State(core): State<Arc<Core>>) -> impl IntoResponse {
    let aggregate = core.metrics.aggregate();
    Json(serde_json::json!({
        "status": "ok",
        "totalNodes": aggregate.total_nodes,
        "averageCpu": aggregate.average_cpu,
        "averageMemory": aggregate.average_memory,
    }))
}

/// `GET /api/v1/health/ready` (§6): ready once at least nothing is actively
/// failing; this process has no external dependency that can be "not ready"
/// beyond having started, so readiness and liveness coincide here.
pub async fn health_ready() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
}

/// `GET /api/v1/health/live` (§6): always 200 once the process is serving.
pub async fn health_live() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}
