//! Resource Tracker (§4.4): per-entity accumulated CPU-minutes, peak RAM,
//! storage, egress, and derived cost, over a billing period.

pub mod tracker;
pub mod types;

pub use tracker::ResourceTracker;
pub use types::{ActiveJob, EntityKey, EntityType, RateCard, UsageRecord};
