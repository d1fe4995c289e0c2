//! Metrics Collector (§4.3): per-node rolling history plus cluster
//! aggregation.

use crate::snapshot::{ClusterMetrics, LoadAverage, MetricSnapshot};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant, SystemTime};

/// Supplies the fields `RecordLocal` can't get from the collector's own
/// counters (cpu/memory/load average). Kept as a trait so `cluster-metrics`
/// doesn't need a dependency on `cluster-loadmonitor` — the orchestrator
/// wires a concrete source at startup.
pub trait LocalLoadSource: Send + Sync {
    fn cpu_usage(&self) -> f64;
    fn memory_usage(&self) -> (f64, u64, u64);
    fn load_average(&self) -> LoadAverage;
}

struct LocalCounters {
    active_jobs: AtomicU32,
    completed_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    started_at: Instant,
}

impl LocalCounters {
    fn new() -> Self {
        Self {
            active_jobs: AtomicU32::new(0),
            completed_jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

pub struct MetricsCollector {
    history: RwLock<HashMap<String, VecDeque<MetricSnapshot>>>,
    max_history_per_node: usize,
    local_node_id: String,
    local_counters: LocalCounters,
}

impl MetricsCollector {
    pub fn new(local_node_id: impl Into<String>, max_history_per_node: usize) -> Self {
        Self {
            history: RwLock::new(HashMap::new()),
            max_history_per_node,
            local_node_id: local_node_id.into(),
            local_counters: LocalCounters::new(),
        }
    }

    /// `SetActiveJobs(n)` (§4.3 counting contract).
    pub fn set_active_jobs(&self, n: u32) {
        self.local_counters.active_jobs.store(n, Ordering::Relaxed);
    }

    /// `RecordJobCompletion(success)` (§4.3 counting contract): monotonic
    /// counters, one increment per call.
    pub fn record_job_completion(&self, success: bool) {
        if success {
            self.local_counters
                .completed_jobs
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.local_counters
                .failed_jobs
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// `RecordLocal(nodeId)` (§4.3): computes a local snapshot from the
    /// injected load source and this collector's own counters, then
    /// appends it to history.
    pub fn record_local(&self, source: &dyn LocalLoadSource) {
        let (memory_usage, memory_used_bytes, memory_total_bytes) = source.memory_usage();
        let snapshot = MetricSnapshot {
            cpu_usage: source.cpu_usage(),
            memory_usage,
            memory_used_bytes,
            memory_total_bytes,
            load_avg: source.load_average(),
            active_jobs: self.local_counters.active_jobs.load(Ordering::Relaxed),
            completed_jobs: self.local_counters.completed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.local_counters.failed_jobs.load(Ordering::Relaxed),
            uptime: self.local_counters.started_at.elapsed(),
            collected_at: SystemTime::now(),
        };
        self.push(self.local_node_id.clone(), snapshot);
    }

    /// `Ingest(nodeId, snapshot)` (§4.3): appends a snapshot received from a
    /// remote node's heartbeat payload.
    pub fn ingest(&self, node_id: impl Into<String>, snapshot: MetricSnapshot) {
        self.push(node_id.into(), snapshot);
    }

    fn push(&self, node_id: String, snapshot: MetricSnapshot) {
        let mut history = self.history.write().unwrap();
        let deque = history.entry(node_id).or_insert_with(VecDeque::new);
        deque.push_back(snapshot);
        while deque.len() > self.max_history_per_node {
            deque.pop_front();
        }
    }

    /// `GetHistory(nodeId, limit) -> snapshots` (§4.3). Returns the most
    /// recent `limit` entries, oldest first.
    pub fn get_history(&self, node_id: &str, limit: usize) -> Vec<MetricSnapshot> {
        let history = self.history.read().unwrap();
        match history.get(node_id) {
            Some(deque) => {
                let skip = deque.len().saturating_sub(limit);
                deque.iter().skip(skip).copied().collect()
            }
            None => Vec::new(),
        }
    }

    /// `Aggregate() -> ClusterMetrics` (§4.3): over the latest snapshot of
    /// each known node.
    pub fn aggregate(&self) -> ClusterMetrics {
        let history = self.history.read().unwrap();
        let latest: Vec<MetricSnapshot> = history
            .values()
            .filter_map(|deque| deque.back().copied())
            .collect();
        ClusterMetrics::from_snapshots(&latest)
    }

    pub fn max_history_per_node(&self) -> usize {
        self.max_history_per_node
    }
}

pub const DEFAULT_MAX_HISTORY_PER_NODE: usize = 360;
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(10);

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;
    impl LocalLoadSource for FixedSource {
        fn cpu_usage(&self) -> f64 {
            42.0
        }
        fn memory_usage(&self) -> (f64, u64, u64) {
            (50.0, 4_000_000_000, 8_000_000_000)
        }
        fn load_average(&self) -> LoadAverage {
            LoadAverage {
                one: 1.0,
                five: 1.0,
                fifteen: 1.0,
            }
        }
    }

    #[test]
    fn history_bound_is_enforced_fifo() {
        let collector = MetricsCollector::new("local", 3);
        for _ in 0..5 {
            collector.record_local(&FixedSource);
        }
        let history = collector.get_history("local", 100);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn counting_contract_is_monotonic() {
        let collector = MetricsCollector::new("local", 10);
        collector.set_active_jobs(2);
        collector.record_job_completion(true);
        collector.record_job_completion(false);
        collector.record_job_completion(true);
        collector.record_local(&FixedSource);
        let snap = collector.get_history("local", 1)[0];
        assert_eq!(snap.active_jobs, 2);
        assert_eq!(snap.completed_jobs, 2);
        assert_eq!(snap.failed_jobs, 1);
    }

    #[test]
    fn aggregate_uses_latest_snapshot_per_node() {
        let collector = MetricsCollector::new("local", 10);
        collector.record_local(&FixedSource);
        collector.ingest(
            "remote",
            MetricSnapshot {
                cpu_usage: 10.0,
                memory_usage: 20.0,
                memory_used_bytes: 1,
                memory_total_bytes: 2,
                load_avg: LoadAverage {
                    one: 0.1,
                    five: 0.1,
                    fifteen: 0.1,
                },
                active_jobs: 1,
                completed_jobs: 5,
                failed_jobs: 0,
                uptime: Duration::from_secs(1),
                collected_at: SystemTime::now(),
            },
        );
        let aggregate = collector.aggregate();
        assert_eq!(aggregate.total_nodes, 2);
        assert_eq!(aggregate.max_cpu, 42.0);
        assert_eq!(aggregate.total_completed_jobs, 5);
    }

    proptest::proptest! {
        #[test]
        fn history_never_exceeds_bound(cap in 1usize..20, pushes in 0usize..200) {
            let collector = MetricsCollector::new("local", cap);
            for _ in 0..pushes {
                collector.record_local(&FixedSource);
            }
            let history = collector.get_history("local", pushes.max(1));
            prop_assert!(history.len() <= cap);
        }
    }
}
