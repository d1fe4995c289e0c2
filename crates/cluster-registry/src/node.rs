//! Node record types (§3).

use std::collections::BTreeSet;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Online,
    Draining,
    Offline,
}

/// Everything a `POST /api/v1/clusters/register` call supplies (§6).
#[derive(Debug, Clone)]
pub struct NodeRegistration {
    pub node_id: String,
    pub display_name: String,
    pub address: String,
    pub capabilities: BTreeSet<String>,
    pub cores: u32,
    pub memory_bytes: u64,
    pub max_jobs: u32,
    pub version: String,
    /// The registering caller's credential. Re-registration under the same
    /// `node_id` must present the same credential (§4.1); a mismatch is an
    /// `AUTH_FAILED` error, not a silent overwrite.
    pub owner_token: String,
}

/// Metric fields carried by a heartbeat (§4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatStats {
    pub active_jobs: u32,
    pub cpu_usage_pct: f64,
    pub memory_usage_pct: f64,
}

/// The authoritative node record (§3). `active_jobs <= max_jobs` is an
/// invariant enforced wherever `active_jobs` is written.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub node_id: String,
    pub display_name: String,
    pub address: String,
    pub capabilities: BTreeSet<String>,
    pub cores: u32,
    pub memory_bytes: u64,
    pub max_jobs: u32,
    pub status: NodeStatus,
    pub registered_at: SystemTime,
    pub last_heartbeat_at: SystemTime,
    pub active_jobs: u32,
    pub cpu_usage_pct: f64,
    pub memory_usage_pct: f64,
    pub version: String,
    pub(crate) owner_token: String,
}

impl NodeRecord {
    pub(crate) fn from_registration(reg: NodeRegistration, now: SystemTime) -> Self {
        Self {
            node_id: reg.node_id,
            display_name: reg.display_name,
            address: reg.address,
            capabilities: reg.capabilities,
            cores: reg.cores,
            memory_bytes: reg.memory_bytes,
            max_jobs: reg.max_jobs,
            status: NodeStatus::Online,
            registered_at: now,
            last_heartbeat_at: now,
            active_jobs: 0,
            cpu_usage_pct: 0.0,
            memory_usage_pct: 0.0,
            version: reg.version,
            owner_token: reg.owner_token,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active_jobs < self.max_jobs
    }

    pub fn is_online(&self) -> bool {
        matches!(self.status, NodeStatus::Online)
    }
}
