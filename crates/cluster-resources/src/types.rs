//! Resource usage data model (§3).

use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Org,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_id: String,
    pub entity_type: EntityType,
}

impl EntityKey {
    pub fn new(entity_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
        }
    }
}

/// Per-`(entityId, entityType)` usage over a billing period (§3).
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub cpu_minutes: f64,
    pub peak_ram_mb: f64,
    pub storage_mb: f64,
    pub network_egress_mb: f64,
    pub job_count: u64,
    pub estimated_cost_cents: i64,
    pub period_start: SystemTime,
    pub period_end: SystemTime,
}

impl UsageRecord {
    pub fn new(period_start: SystemTime, period_end: SystemTime) -> Self {
        Self {
            cpu_minutes: 0.0,
            peak_ram_mb: 0.0,
            storage_mb: 0.0,
            network_egress_mb: 0.0,
            job_count: 0,
            estimated_cost_cents: 0,
            period_start,
            period_end,
        }
    }
}

/// An in-flight job descriptor (§3).
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub job_id: String,
    pub entity: EntityKey,
    pub started_at: SystemTime,
    pub cpu_cores: f64,
    pub ram_mb: f64,
}

/// Cost rates (cents per unit). Defaults reproduce the worked example in
/// spec.md §8 scenario 6: a 1-hour period, 2-core/4096 MB-ram/30-minute job
/// with 512 MB egress costs 57 cents (`round(60*0.8 + 4*1.0 + 0 + 0.5*9.0)`).
/// Storage's default rate is not exercised by any spec scenario; it is set
/// to the same per-GB order of magnitude as egress pending a real pricing
/// decision upstream.
#[derive(Debug, Clone, Copy)]
pub struct RateCard {
    pub cpu_cents_per_minute: f64,
    pub ram_cents_per_gb_hour: f64,
    pub storage_cents_per_gb: f64,
    pub egress_cents_per_gb: f64,
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            cpu_cents_per_minute: 0.8,
            ram_cents_per_gb_hour: 1.0,
            storage_cents_per_gb: 2.0,
            egress_cents_per_gb: 9.0,
        }
    }
}
