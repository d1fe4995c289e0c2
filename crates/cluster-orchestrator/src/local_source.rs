//! Adapter feeding the local node's own load into the Metrics Collector
//! (§4.3 `RecordLocal`). The Load Monitor's cached snapshot already has the
//! cpu/memory percentages the Gateway's overload check needs; the collector
//! additionally wants byte-level memory and a three-window load average,
//! which nothing else in the process samples, so this adapter reads
//! `/proc/meminfo` and `/proc/loadavg` itself. Unlike the Load Monitor this
//! runs only on the collector's own periodic tick, never the hot path, so a
//! direct blocking read here doesn't violate §4.2's non-blocking snapshot
//! contract.

use cluster_loadmonitor::{LoadMonitor, Sampler};
use cluster_metrics::LocalLoadSource;
use cluster_metrics::LoadAverage;
use std::fs;
use std::sync::Arc;

pub struct LocalSource<S: Sampler> {
    monitor: Arc<LoadMonitor<S>>,
}

impl<S: Sampler> LocalSource<S> {
    pub fn new(monitor: Arc<LoadMonitor<S>>) -> Self {
        Self { monitor }
    }
}

impl<S: Sampler> LocalLoadSource for LocalSource<S> {
    fn cpu_usage(&self) -> f64 {
        self.monitor.snapshot().cpu_pct
    }

    fn memory_usage(&self) -> (f64, u64, u64) {
        let pct = self.monitor.snapshot().memory_pct;
        let (used, total) = read_meminfo_bytes().unwrap_or((0, 0));
        (pct, used, total)
    }

    fn load_average(&self) -> LoadAverage {
        read_loadavg().unwrap_or(LoadAverage {
            one: 0.0,
            five: 0.0,
            fifteen: 0.0,
        })
    }
}

fn read_meminfo_bytes() -> Option<(u64, u64)> {
    let contents = fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = None;
    let mut available_kb = None;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = parse_kb(rest);
        }
    }
    let total = total_kb?;
    let available = available_kb?;
    let used = (total - available).max(0.0);
    Some(((used * 1024.0) as u64, (total * 1024.0) as u64))
}

fn read_loadavg() -> Option<LoadAverage> {
    let contents = fs::read_to_string("/proc/loadavg").ok()?;
    let mut fields = contents.split_whitespace();
    let one = fields.next()?.parse().ok()?;
    let five = fields.next()?.parse().ok()?;
    let fifteen = fields.next()?.parse().ok()?;
    Some(LoadAverage { one, five, fifteen })
}

fn parse_kb(field: &str) -> Option<f64> {
    field.trim().trim_end_matches(" kB").trim().parse::<f64>().ok()
}
