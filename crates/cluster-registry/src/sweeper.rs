//! Background offline-sweeper task (§4.1).

use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Spawns the periodic sweep. The returned handle is meant to be tracked by
/// a [`cluster_core::TaskSupervisor`] so shutdown can cancel it cleanly.
pub fn spawn(
    registry: Arc<Registry>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    registry.sweep_offline();
                }
            }
        }
    })
}
