//! The Node Registry (§4.1): authoritative `nodeId -> NodeRecord` mapping.

use crate::node::{HeartbeatStats, NodeRecord, NodeRegistration, NodeStatus};
use cluster_core::ClusterError;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Outcome of a `register` call, distinguishing a brand-new node from an
/// idempotent re-registration (useful for metrics/logging, not part of the
/// wire response which is `{accepted, nodeId}` either way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    Updated,
}

pub struct Registry {
    nodes: RwLock<HashMap<String, NodeRecord>>,
    node_timeout: Duration,
}

impl Registry {
    pub fn new(node_timeout: Duration) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            node_timeout,
        }
    }

    /// `Register(record) -> ok | conflict` (§4.1). Idempotent on `node_id`
    /// when the credential matches; a same-id, different-credential call is
    /// rejected with `AUTH_FAILED` rather than silently overwriting another
    /// owner's node.
    pub fn register(&self, reg: NodeRegistration) -> Result<RegisterOutcome, ClusterError> {
        let now = SystemTime::now();
        let mut nodes = self.nodes.write().unwrap();
        match nodes.get_mut(&reg.node_id) {
            Some(existing) if existing.owner_token != reg.owner_token => {
                Err(ClusterError::auth_failed(format!(
                    "node '{}' is already registered under a different credential",
                    reg.node_id
                )))
            }
            Some(existing) => {
                existing.display_name = reg.display_name;
                existing.address = reg.address;
                existing.capabilities = reg.capabilities;
                existing.cores = reg.cores;
                existing.memory_bytes = reg.memory_bytes;
                existing.max_jobs = reg.max_jobs;
                existing.version = reg.version;
                if !existing.is_online() {
                    existing.status = NodeStatus::Online;
                }
                existing.last_heartbeat_at = now;
                tracing::info!(node_id = %existing.node_id, "node re-registered");
                Ok(RegisterOutcome::Updated)
            }
            None => {
                let node_id = reg.node_id.clone();
                nodes.insert(node_id.clone(), NodeRecord::from_registration(reg, now));
                tracing::info!(%node_id, "node registered");
                Ok(RegisterOutcome::Created)
            }
        }
    }

    /// `Heartbeat(nodeId, stats)` (§4.1): refreshes liveness and load fields;
    /// an Offline node that heartbeats fresh becomes Online again.
    pub fn heartbeat(&self, node_id: &str, stats: HeartbeatStats) -> Result<(), ClusterError> {
        let mut nodes = self.nodes.write().unwrap();
        let node = nodes
            .get_mut(node_id)
            .ok_or_else(|| ClusterError::node_not_found(node_id))?;
        node.last_heartbeat_at = SystemTime::now();
        node.active_jobs = stats.active_jobs;
        node.cpu_usage_pct = stats.cpu_usage_pct;
        node.memory_usage_pct = stats.memory_usage_pct;
        if matches!(node.status, NodeStatus::Offline) {
            node.status = NodeStatus::Online;
            tracing::info!(%node_id, "node back online after heartbeat");
        }
        Ok(())
    }

    /// `Drain(nodeId)` (§4.1): forbids new dispatch; the node stays in the
    /// registry until explicitly removed, even once `active_jobs` reaches 0.
    pub fn drain(&self, node_id: &str) -> Result<(), ClusterError> {
        let mut nodes = self.nodes.write().unwrap();
        let node = nodes
            .get_mut(node_id)
            .ok_or_else(|| ClusterError::node_not_found(node_id))?;
        node.status = NodeStatus::Draining;
        tracing::info!(%node_id, "node draining");
        Ok(())
    }

    /// `Remove(nodeId)` (§4.1).
    pub fn remove(&self, node_id: &str) -> Result<(), ClusterError> {
        let mut nodes = self.nodes.write().unwrap();
        if nodes.remove(node_id).is_none() {
            return Err(ClusterError::node_not_found(node_id));
        }
        tracing::info!(%node_id, "node removed");
        Ok(())
    }

    /// `Get(nodeId) -> record | NotFound` (§4.1).
    pub fn get(&self, node_id: &str) -> Result<NodeRecord, ClusterError> {
        self.nodes
            .read()
            .unwrap()
            .get(node_id)
            .cloned()
            .ok_or_else(|| ClusterError::node_not_found(node_id))
    }

    /// `ListOnline() -> snapshot` (§4.1): a consistent point-in-time clone;
    /// the lock is released before the caller can observe or mutate
    /// anything, so there is no way to mutate through it.
    pub fn list_online(&self) -> Vec<NodeRecord> {
        self.nodes
            .read()
            .unwrap()
            .values()
            .filter(|n| n.is_online())
            .cloned()
            .collect()
    }

    /// All records regardless of status, for admin/debug surfaces.
    pub fn list_all(&self) -> Vec<NodeRecord> {
        self.nodes.read().unwrap().values().cloned().collect()
    }

    /// Downgrades nodes whose last heartbeat is older than `node_timeout`
    /// (§4.1 background sweeper). Returns the ids that were downgraded.
    pub fn sweep_offline(&self) -> Vec<String> {
        let now = SystemTime::now();
        let mut nodes = self.nodes.write().unwrap();
        let mut downgraded = Vec::new();
        for node in nodes.values_mut() {
            if node.is_online() {
                let age = now
                    .duration_since(node.last_heartbeat_at)
                    .unwrap_or_default();
                if age >= self.node_timeout {
                    node.status = NodeStatus::Offline;
                    downgraded.push(node.node_id.clone());
                }
            }
        }
        if !downgraded.is_empty() {
            tracing::warn!(nodes = ?downgraded, "nodes marked offline after missed heartbeats");
        }
        downgraded
    }
}
