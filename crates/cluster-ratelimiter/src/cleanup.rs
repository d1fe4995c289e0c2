//! Background sweep that drops empty/expired buckets (§4.5), mirroring
//! `cluster-registry::sweeper` and `cluster-loadmonitor::ticker`.

use crate::limiter::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("rate limiter cleanup task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    limiter.cleanup_empty_buckets();
                }
            }
        }
    })
}
