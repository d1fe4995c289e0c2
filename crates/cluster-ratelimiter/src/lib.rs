//! Rate Limiter (§4.5): multi-rule sliding-window admission control keyed
//! by an arbitrary string (user id, org id, node id, ...).

pub mod cleanup;
pub mod decision;
pub mod limiter;
pub mod rule;

pub use cleanup::{spawn as spawn_cleanup, DEFAULT_CLEANUP_INTERVAL};
pub use decision::RateLimitDecision;
pub use limiter::RateLimiter;
pub use rule::RateLimitRule;
