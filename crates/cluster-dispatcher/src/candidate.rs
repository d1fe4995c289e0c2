//! Candidate selection (§4.7 step 1): online, circuit-admitted, unfull
//! nodes, sorted for a deterministic round-robin order.

use cluster_circuitbreaker::CircuitBreakerTable;
use cluster_registry::Registry;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub node_id: String,
    pub address: String,
}

/// A non-committing view of who *could* be dispatched to right now. Ordered
/// by `node_id` so the round-robin cursor walks a stable sequence — the
/// registry's underlying map has no iteration order of its own, so this is
/// "registry iteration order" (§4.7) in this implementation.
pub fn admitted_candidates(registry: &Registry, circuits: &CircuitBreakerTable) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = registry
        .list_online()
        .into_iter()
        .filter(|n| n.has_capacity() && circuits.would_allow(&n.node_id))
        .map(|n| Candidate {
            node_id: n.node_id,
            address: n.address,
        })
        .collect();
    candidates.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_circuitbreaker::CircuitBreakerConfig;
    use cluster_registry::{NodeRegistration, Registry};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn registration(id: &str) -> NodeRegistration {
        NodeRegistration {
            node_id: id.to_string(),
            display_name: id.to_string(),
            address: format!("http://{id}.local:9000"),
            capabilities: BTreeSet::new(),
            cores: 4,
            memory_bytes: 1 << 30,
            max_jobs: 10,
            version: "1.0.0".to_string(),
            owner_token: "tok".to_string(),
        }
    }

    #[test]
    fn excludes_full_and_circuit_open_nodes() {
        let registry = Registry::new(Duration::from_secs(30));
        registry.register(registration("n1")).unwrap();
        registry.register(registration("n2")).unwrap();
        registry.register(registration("n3")).unwrap();

        let circuits = CircuitBreakerTable::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        circuits.on_failure("n2"); // opens n2's breaker

        registry
            .heartbeat(
                "n3",
                cluster_registry::HeartbeatStats {
                    active_jobs: 10,
                    ..Default::default()
                },
            )
            .unwrap(); // n3 is at capacity

        let candidates = admitted_candidates(&registry, &circuits);
        assert_eq!(
            candidates.into_iter().map(|c| c.node_id).collect::<Vec<_>>(),
            vec!["n1".to_string()]
        );
    }
}
