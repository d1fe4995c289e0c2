//! Background refresh ticker driving the cached snapshot (§4.2, §5).

use crate::monitor::LoadMonitor;
use crate::sampler::Sampler;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn spawn<S: Sampler + 'static>(
    monitor: Arc<LoadMonitor<S>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    monitor.refresh();
                }
            }
        }
    })
}
