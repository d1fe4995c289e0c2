//! Shared foundation for the cluster orchestration core: the canonical error
//! taxonomy (§4.9), opaque structured metadata (§9), environment-driven
//! configuration (§6), and the task-lifecycle plumbing the process-wide
//! `Core` object is built from (§9).

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metadata;

pub use config::{Config, ConfigError, RawRateLimitRule};
pub use error::{ClusterError, ClusterErrorKind};
pub use lifecycle::TaskSupervisor;
pub use metadata::Metadata;

/// Generates a fresh correlation id for a request that hit an unhandled
/// error at the gateway boundary (§7).
pub fn correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
