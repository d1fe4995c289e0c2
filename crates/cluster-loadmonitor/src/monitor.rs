//! The Load Monitor (§4.2).

use crate::sampler::{CpuTimes, Sampler};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct LoadSnapshot {
    pub cpu_pct: f64,
    pub memory_pct: f64,
    pub collected_at: Instant,
}

pub struct Thresholds {
    pub ram_pct: f64,
    pub cpu_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ram_pct: 90.0,
            cpu_pct: 100.0,
        }
    }
}

struct CachedState {
    snapshot: LoadSnapshot,
    previous_cpu_times: Option<CpuTimes>,
}

/// Samples CPU/RAM at a fixed interval and caches the result so
/// [`LoadMonitor::snapshot`] and [`LoadMonitor::should_forward`] never block
/// on I/O (§4.2: "cached; non-blocking").
pub struct LoadMonitor<S: Sampler> {
    sampler: S,
    thresholds: Thresholds,
    state: RwLock<CachedState>,
}

impl<S: Sampler> LoadMonitor<S> {
    pub fn new(sampler: S, thresholds: Thresholds) -> Self {
        let now = Instant::now();
        let first_memory = sampler.memory_pct().unwrap_or(0.0);
        let first_cpu = first_sample_cpu_pct(&sampler);
        Self {
            sampler,
            thresholds,
            state: RwLock::new(CachedState {
                snapshot: LoadSnapshot {
                    cpu_pct: first_cpu,
                    memory_pct: first_memory,
                    collected_at: now,
                },
                previous_cpu_times: None,
            }),
        }
    }

    /// `Snapshot()` (§4.2): cached, non-blocking.
    pub fn snapshot(&self) -> LoadSnapshot {
        self.state.read().unwrap().snapshot
    }

    /// `ShouldForward()` (§4.2): true iff both thresholds are met.
    /// Testable property (§8): `ShouldForward ⇒ memoryPct >= RAM_THRESHOLD
    /// ∧ cpuPct >= CPU_THRESHOLD` holds by construction here.
    pub fn should_forward(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.memory_pct >= self.thresholds.ram_pct
            && snapshot.cpu_pct >= self.thresholds.cpu_pct
    }

    /// Takes a fresh sample and refreshes the cache. Called by the
    /// background ticker; never invoked from the hot request path.
    pub fn refresh(&self) {
        let memory_pct = match self.sampler.memory_pct() {
            Ok(v) => v,
            Err(error) => {
                tracing::warn!(%error, "failed to sample memory usage");
                self.snapshot().memory_pct
            }
        };
        let mut state = self.state.write().unwrap();
        let cpu_pct = match self.sampler.cpu_times() {
            Ok(current) => {
                let pct = state
                    .previous_cpu_times
                    .and_then(|prev| current.busy_pct_since(prev))
                    .unwrap_or_else(|| state.snapshot.cpu_pct);
                state.previous_cpu_times = Some(current);
                pct
            }
            Err(error) => {
                tracing::warn!(%error, "failed to sample cpu times");
                state.snapshot.cpu_pct
            }
        };
        state.snapshot = LoadSnapshot {
            cpu_pct,
            memory_pct,
            collected_at: Instant::now(),
        };
    }
}

/// First-sample special case (§4.2): delta-based CPU usage needs two
/// samples, so the very first reading instead scales the 1-minute load
/// average by core count.
fn first_sample_cpu_pct(sampler: &impl Sampler) -> f64 {
    let load_avg = sampler.load_avg_1m().unwrap_or(0.0);
    let cores = sampler.core_count().max(1) as f64;
    (load_avg / cores) * 100.0
}

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::test_support::FixedSampler;
    use std::sync::Mutex;

    fn sampler(load_avg: f64, core_count: usize) -> FixedSampler {
        FixedSampler {
            cpu_times: Mutex::new(Vec::new()),
            memory_pct: Mutex::new(Vec::new()),
            load_avg_1m: load_avg,
            core_count,
        }
    }

    #[test]
    fn first_sample_uses_scaled_load_average() {
        let monitor = LoadMonitor::new(sampler(4.0, 4), Thresholds::default());
        assert_eq!(monitor.snapshot().cpu_pct, 100.0);
    }

    #[test]
    fn should_forward_requires_both_thresholds() {
        let s = sampler(0.0, 4);
        // one memory reading consumed by `new`, one per subsequent `refresh`;
        // two cpu_times readings so the second refresh can compute a delta.
        *s.memory_pct.lock().unwrap() = vec![Ok(0.0), Ok(95.0), Ok(95.0)];
        *s.cpu_times.lock().unwrap() = vec![
            Ok(CpuTimes { idle: 0, total: 100 }),
            Ok(CpuTimes { idle: 0, total: 200 }),
        ];
        let monitor = LoadMonitor::new(s, Thresholds::default());
        monitor.refresh();
        monitor.refresh();
        // cpu busy_pct from (0,100)->(0,200) is 100%, memory is over threshold
        assert!(monitor.should_forward());
    }

    #[test]
    fn should_forward_false_when_only_memory_over() {
        let s = sampler(0.0, 4);
        *s.memory_pct.lock().unwrap() = vec![Ok(0.0), Ok(95.0), Ok(95.0)];
        *s.cpu_times.lock().unwrap() = vec![
            Ok(CpuTimes { idle: 50, total: 100 }),
            Ok(CpuTimes { idle: 120, total: 200 }),
        ];
        let monitor = LoadMonitor::new(s, Thresholds::default());
        monitor.refresh();
        monitor.refresh();
        assert!(!monitor.should_forward());
    }
}
