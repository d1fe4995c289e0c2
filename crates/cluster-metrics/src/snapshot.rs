//! Metric snapshot type (§3).

use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricSnapshot {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub load_avg: LoadAverage,
    pub active_jobs: u32,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub uptime: Duration,
    pub collected_at: SystemTime,
}

/// Cluster-wide aggregate over the latest snapshot of each known node
/// (§4.3). `collected_at` is stamped at aggregation time so callers can
/// detect staleness even though the underlying per-node snapshots may be
/// slightly older (supplementary field, see `SPEC_FULL.md` §3).
#[derive(Debug, Clone, Copy)]
pub struct ClusterMetrics {
    pub total_nodes: usize,
    pub average_cpu: f64,
    pub max_cpu: f64,
    pub average_memory: f64,
    pub total_active_jobs: u64,
    pub total_completed_jobs: u64,
    pub total_failed_jobs: u64,
    pub collected_at: SystemTime,
}

impl ClusterMetrics {
    pub(crate) fn from_snapshots(snapshots: &[MetricSnapshot]) -> Self {
        if snapshots.is_empty() {
            return Self {
                total_nodes: 0,
                average_cpu: 0.0,
                max_cpu: 0.0,
                average_memory: 0.0,
                total_active_jobs: 0,
                total_completed_jobs: 0,
                total_failed_jobs: 0,
                collected_at: SystemTime::now(),
            };
        }
        let n = snapshots.len() as f64;
        let average_cpu = snapshots.iter().map(|s| s.cpu_usage).sum::<f64>() / n;
        let max_cpu = snapshots
            .iter()
            .map(|s| s.cpu_usage)
            .fold(f64::MIN, f64::max);
        let average_memory = snapshots.iter().map(|s| s.memory_usage).sum::<f64>() / n;
        let total_active_jobs = snapshots.iter().map(|s| s.active_jobs as u64).sum();
        let total_completed_jobs = snapshots.iter().map(|s| s.completed_jobs).sum();
        let total_failed_jobs = snapshots.iter().map(|s| s.failed_jobs).sum();
        Self {
            total_nodes: snapshots.len(),
            average_cpu,
            max_cpu,
            average_memory,
            total_active_jobs,
            total_completed_jobs,
            total_failed_jobs,
            collected_at: SystemTime::now(),
        }
    }
}
