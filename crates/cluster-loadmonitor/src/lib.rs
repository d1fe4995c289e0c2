//! Load Monitor (§4.2): samples local CPU/RAM usage on a fixed interval and
//! decides, via a cached, non-blocking check, whether the local process is
//! overloaded enough that the Gateway should forward instead of serving
//! requests locally.

pub mod monitor;
pub mod sampler;
pub mod ticker;

pub use monitor::{LoadMonitor, LoadSnapshot, Thresholds, DEFAULT_SAMPLE_INTERVAL};
pub use sampler::{ProcSampler, Sampler};
