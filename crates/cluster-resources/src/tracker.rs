//! Resource Tracker (§4.4).

use crate::types::{ActiveJob, EntityKey, RateCard, UsageRecord};
use cluster_core::ClusterError;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

pub struct ResourceTracker {
    usage: RwLock<HashMap<EntityKey, UsageRecord>>,
    active_jobs: RwLock<HashMap<String, ActiveJob>>,
    rates: RateCard,
}

impl ResourceTracker {
    pub fn new(rates: RateCard) -> Self {
        Self {
            usage: RwLock::new(HashMap::new()),
            active_jobs: RwLock::new(HashMap::new()),
            rates,
        }
    }

    /// `InitPeriod(entity, [start,end])` (§4.4): creates or resets a usage
    /// record for the billing period.
    pub fn init_period(&self, entity: EntityKey, start: SystemTime, end: SystemTime) {
        let mut usage = self.usage.write().unwrap();
        usage.insert(entity, UsageRecord::new(start, end));
    }

    /// `StartJob(jobId, entity, cores, ramMb)` (§4.4). If the entity has no
    /// initialized period yet, one is opened starting now with an
    /// unbounded end (the caller is expected to have called `init_period`
    /// first in the normal billing flow; this is a defensive fallback, not
    /// the primary path).
    pub fn start_job(&self, job_id: impl Into<String>, entity: EntityKey, cores: f64, ram_mb: f64) {
        let job_id = job_id.into();
        let now = SystemTime::now();
        {
            let mut usage = self.usage.write().unwrap();
            let record = usage
                .entry(entity.clone())
                .or_insert_with(|| UsageRecord::new(now, now));
            record.job_count += 1;
        }
        self.active_jobs.write().unwrap().insert(
            job_id.clone(),
            ActiveJob {
                job_id,
                entity,
                started_at: now,
                cpu_cores: cores,
                ram_mb,
            },
        );
    }

    /// `EndJob(jobId, egressMb)` (§4.4): computes elapsed CPU-minutes,
    /// updates the running peak RAM, adds egress, and recomputes cost.
    pub fn end_job(&self, job_id: &str, egress_mb: f64) -> Result<(), ClusterError> {
        let job = self
            .active_jobs
            .write()
            .unwrap()
            .remove(job_id)
            .ok_or_else(|| ClusterError::job_not_found(job_id))?;

        let duration_ms = SystemTime::now()
            .duration_since(job.started_at)
            .unwrap_or_default()
            .as_millis() as f64;
        let mut usage = self.usage.write().unwrap();
        let record = usage
            .entry(job.entity)
            .or_insert_with(|| UsageRecord::new(job.started_at, job.started_at));
        record.cpu_minutes += (duration_ms / 60_000.0) * job.cpu_cores;
        record.peak_ram_mb = record.peak_ram_mb.max(job.ram_mb);
        record.network_egress_mb += egress_mb;
        record.estimated_cost_cents = compute_cost_cents(record, &self.rates);
        Ok(())
    }

    /// `RecordStorage(entity, storageMb)` (§4.4): replaces the stored value
    /// and recomputes cost.
    pub fn record_storage(&self, entity: EntityKey, storage_mb: f64) {
        let mut usage = self.usage.write().unwrap();
        let now = SystemTime::now();
        let record = usage
            .entry(entity)
            .or_insert_with(|| UsageRecord::new(now, now));
        record.storage_mb = storage_mb;
        record.estimated_cost_cents = compute_cost_cents(record, &self.rates);
    }

    pub fn usage(&self, entity: &EntityKey) -> Option<UsageRecord> {
        self.usage.read().unwrap().get(entity).cloned()
    }
}

/// Cost formula (§4.4), rounded to the nearest integer cent.
///
/// `ramHours` deliberately charges for the *peak* RAM allocation over the
/// *entire period*, not the actual RAM-time the job held it — this
/// over-counts for jobs shorter than the period. That is a preserved
/// approximation from the source system, not a bug (§9 Open Question,
/// `DESIGN.md`).
fn compute_cost_cents(record: &UsageRecord, rates: &RateCard) -> i64 {
    let period_hours = record
        .period_end
        .duration_since(record.period_start)
        .unwrap_or_default()
        .as_secs_f64()
        / 3600.0;
    let ram_hours = (record.peak_ram_mb / 1024.0) * period_hours;
    let cost = record.cpu_minutes * rates.cpu_cents_per_minute
        + ram_hours * rates.ram_cents_per_gb_hour
        + (record.storage_mb / 1024.0) * rates.storage_cents_per_gb
        + (record.network_egress_mb / 1024.0) * rates.egress_cents_per_gb;
    cost.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;
    use std::time::Duration;

    #[test]
    fn scenario_6_cost_computation() {
        let tracker = ResourceTracker::new(RateCard::default());
        let entity = EntityKey::new("acme", EntityType::Org);
        let start = SystemTime::now();
        let end = start + Duration::from_secs(3600);
        tracker.init_period(entity.clone(), start, end);

        // Simulate a 30-minute, 2-core, 4096 MB job by directly constructing
        // the post-job state the formula expects (duration is driven by wall
        // clock in `start_job`/`end_job`, so the arithmetic is exercised
        // directly here to pin the exact worked example from spec.md §8).
        {
            let mut usage = tracker.usage.write().unwrap();
            let record = usage.get_mut(&entity).unwrap();
            record.cpu_minutes = 60.0; // 30 min * 2 cores
            record.peak_ram_mb = 4096.0;
            record.network_egress_mb = 512.0;
            record.estimated_cost_cents =
                super::compute_cost_cents(record, &RateCard::default());
        }
        let usage = tracker.usage(&entity).unwrap();
        assert_eq!(usage.cpu_minutes, 60.0);
        assert_eq!(usage.estimated_cost_cents, 57);
    }

    #[test]
    fn end_job_unknown_id_is_job_not_found() {
        let tracker = ResourceTracker::new(RateCard::default());
        let err = tracker.end_job("missing", 0.0).unwrap_err();
        assert_eq!(err.kind, cluster_core::ClusterErrorKind::JobNotFound);
    }

    #[test]
    fn peak_ram_is_monotonic_max() {
        let tracker = ResourceTracker::new(RateCard::default());
        let entity = EntityKey::new("u1", EntityType::User);
        let now = SystemTime::now();
        tracker.init_period(entity.clone(), now, now + Duration::from_secs(3600));

        tracker.start_job("j1", entity.clone(), 1.0, 2048.0);
        tracker.end_job("j1", 0.0).unwrap();
        tracker.start_job("j2", entity.clone(), 1.0, 1024.0);
        tracker.end_job("j2", 0.0).unwrap();

        let usage = tracker.usage(&entity).unwrap();
        assert_eq!(usage.peak_ram_mb, 2048.0);
    }

    #[test]
    fn cpu_minutes_and_cost_are_non_decreasing_across_jobs() {
        let tracker = ResourceTracker::new(RateCard::default());
        let entity = EntityKey::new("u1", EntityType::User);
        let now = SystemTime::now();
        tracker.init_period(entity.clone(), now, now + Duration::from_secs(3600));

        let mut previous_cpu_minutes = 0.0;
        let mut previous_cost = 0;
        for i in 0..5 {
            let job_id = format!("job-{i}");
            tracker.start_job(&job_id, entity.clone(), 1.0, 512.0);
            tracker.end_job(&job_id, 10.0).unwrap();
            let usage = tracker.usage(&entity).unwrap();
            assert!(usage.cpu_minutes >= previous_cpu_minutes);
            assert!(usage.estimated_cost_cents >= previous_cost);
            previous_cpu_minutes = usage.cpu_minutes;
            previous_cost = usage.estimated_cost_cents;
        }
    }
}
