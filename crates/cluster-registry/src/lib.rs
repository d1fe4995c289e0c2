//! Node Registry (§4.1): the authoritative `nodeId -> NodeRecord` mapping,
//! heartbeat ingest, drain/remove commands, and the background sweeper that
//! downgrades nodes with a stale heartbeat to `Offline`.

pub mod node;
pub mod registry;
pub mod sweeper;

pub use node::{HeartbeatStats, NodeRecord, NodeRegistration, NodeStatus};
pub use registry::{RegisterOutcome, Registry};
