//! Metrics Collector (§4.3): per-node rolling history (bounded, FIFO) and
//! cluster-wide aggregation over the latest snapshot of each known node.

pub mod collector;
pub mod snapshot;

pub use collector::{
    LocalLoadSource, MetricsCollector, DEFAULT_COLLECTION_INTERVAL, DEFAULT_MAX_HISTORY_PER_NODE,
};
pub use snapshot::{ClusterMetrics, LoadAverage, MetricSnapshot};
