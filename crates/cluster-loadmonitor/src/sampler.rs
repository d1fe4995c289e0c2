//! OS-level sampling. Nothing in the retrieved corpus wraps exactly this
//! concern (reading `/proc/stat`/`/proc/meminfo`/`/proc/loadavg`), so this is
//! the one place a small hand-rolled reader is the correct choice rather
//! than reaching for an ecosystem crate (documented in `SPEC_FULL.md` §4.2).
//! The trait seam keeps [`crate::monitor::LoadMonitor`] testable without
//! touching the real filesystem.

use std::fs;
use std::io;

/// Cumulative CPU time counters, in USER_HZ jiffies, as reported by the
/// first `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Fraction of CPU busy between two samples, in `[0, 100]`.
    pub fn busy_pct_since(&self, previous: CpuTimes) -> Option<f64> {
        let total_delta = self.total.checked_sub(previous.total)?;
        let idle_delta = self.idle.checked_sub(previous.idle)?;
        if total_delta == 0 {
            return None;
        }
        let busy_delta = total_delta.saturating_sub(idle_delta);
        Some((busy_delta as f64 / total_delta as f64) * 100.0)
    }
}

pub trait Sampler: Send + Sync {
    fn cpu_times(&self) -> io::Result<CpuTimes>;
    fn memory_pct(&self) -> io::Result<f64>;
    fn load_avg_1m(&self) -> io::Result<f64>;
    fn core_count(&self) -> usize;
}

/// Reads `/proc/stat`, `/proc/meminfo`, and `/proc/loadavg` directly.
pub struct ProcSampler {
    core_count: usize,
}

impl ProcSampler {
    pub fn new() -> Self {
        Self {
            core_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for ProcSampler {
    fn cpu_times(&self) -> io::Result<CpuTimes> {
        let contents = fs::read_to_string("/proc/stat")?;
        let line = contents
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing cpu line"))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|f| f.parse::<u64>().ok())
            .collect();
        if fields.len() < 4 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "short cpu line"));
        }
        // user, nice, system, idle, iowait, irq, softirq, steal, ...
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        let total: u64 = fields.iter().sum();
        Ok(CpuTimes { idle, total })
    }

    fn memory_pct(&self) -> io::Result<f64> {
        let contents = fs::read_to_string("/proc/meminfo")?;
        let mut total_kb = None;
        let mut available_kb = None;
        for line in contents.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kb = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kb = parse_kb(rest);
            }
        }
        let (total, available) = match (total_kb, available_kb) {
            (Some(t), Some(a)) if t > 0.0 => (t, a),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "missing MemTotal/MemAvailable",
                ))
            }
        };
        Ok(((total - available) / total) * 100.0)
    }

    fn load_avg_1m(&self) -> io::Result<f64> {
        let contents = fs::read_to_string("/proc/loadavg")?;
        contents
            .split_whitespace()
            .next()
            .and_then(|f| f.parse::<f64>().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed /proc/loadavg"))
    }

    fn core_count(&self) -> usize {
        self.core_count.max(1)
    }
}

fn parse_kb(field: &str) -> Option<f64> {
    field
        .trim()
        .trim_end_matches(" kB")
        .trim()
        .parse::<f64>()
        .ok()
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// An in-memory sampler for tests: each call pops the next queued
    /// reading rather than touching the filesystem.
    pub struct FixedSampler {
        pub cpu_times: Mutex<Vec<io::Result<CpuTimes>>>,
        pub memory_pct: Mutex<Vec<io::Result<f64>>>,
        pub load_avg_1m: f64,
        pub core_count: usize,
    }

    impl Sampler for FixedSampler {
        fn cpu_times(&self) -> io::Result<CpuTimes> {
            let mut queue = self.cpu_times.lock().unwrap();
            if queue.is_empty() {
                Ok(CpuTimes::default())
            } else {
                queue.remove(0)
            }
        }

        fn memory_pct(&self) -> io::Result<f64> {
            let mut queue = self.memory_pct.lock().unwrap();
            if queue.is_empty() {
                Ok(0.0)
            } else {
                queue.remove(0)
            }
        }

        fn load_avg_1m(&self) -> io::Result<f64> {
            Ok(self.load_avg_1m)
        }

        fn core_count(&self) -> usize {
            self.core_count
        }
    }
}
