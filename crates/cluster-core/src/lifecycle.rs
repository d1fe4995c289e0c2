//! Shared lifecycle plumbing for the process-wide `Core` object (§9 "Global
//! mutable state"). The orchestrator's own `Core` (in `cluster-orchestrator`)
//! owns the registry, metrics collector, etc. and composes one
//! [`TaskSupervisor`] to track every sweeper/cleanup task it spawns, so
//! `stop()` cancels them all deterministically — grounded on the teacher's
//! background-task-with-stored-`JoinHandle` discipline in
//! `tower-resilience-adaptive` and `tower-resilience-cache`.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tracks background tasks spawned during `Core::start()` so they can be
/// cancelled in `Core::stop()` without leaking or panicking on drop.
pub struct TaskSupervisor {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// A child token tasks should select against to notice shutdown.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Cancels every tracked task's token and awaits their completion,
    /// bounded by `grace_period`. Tasks that don't observe cancellation in
    /// time are aborted outright.
    pub async fn shutdown(mut self, grace_period: std::time::Duration) {
        self.token.cancel();
        let deadline = tokio::time::Instant::now() + grace_period;
        for handle in self.handles.drain(..) {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    tracing::warn!(error = %join_err, "sweeper task ended abnormally during shutdown");
                }
                Err(_) => {
                    tracing::warn!("sweeper task did not stop within grace period; abandoning");
                }
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_cancels_tracked_tasks() {
        let mut supervisor = TaskSupervisor::new();
        let token = supervisor.child_token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });
        supervisor.track(handle);
        supervisor.shutdown(Duration::from_secs(1)).await;
    }
}
