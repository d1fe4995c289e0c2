//! Cluster orchestration core: wires `Config` into a `Core`, mounts the
//! control endpoints and the catch-all gateway route, and serves until
//! `SIGTERM`/`SIGINT` triggers a graceful shutdown (§6 ambient additions).

mod auth;
mod core;
mod forward;
mod handlers;
mod local_source;

use crate::core::Core;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use cluster_core::{Config, TaskSupervisor};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };
    let port = config.port;
    let core = Arc::new(Core::new(config));

    let mut supervisor = TaskSupervisor::new();
    core.start(&mut supervisor);

    let control_routes = Router::new()
        .route("/api/v1/clusters/register", post(handlers::register))
        .route("/api/v1/clusters/heartbeat", post(handlers::heartbeat))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&core),
            auth::require_cluster_token,
        ));

    let app = Router::new()
        .merge(control_routes)
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/health/ready", get(handlers::health_ready))
        .route("/api/v1/health/live", get(handlers::health_live))
        .fallback(forward::forward)
        .with_state(core);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "cluster orchestration core listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    supervisor.shutdown(Core::supervisor_grace_period()).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
