//! Circuit Breaker Table (§4.6): per-node `Closed`/`Open`/`HalfOpen` state,
//! `on_success`/`on_failure`/`allow`, single-probe HalfOpen admission, and
//! exponential backoff on repeated probe failure, capped at a maximum.

pub mod backoff;
mod entry;
pub mod state;
pub mod table;

pub use backoff::ExponentialBackoff;
pub use state::{AllowDecision, CircuitSnapshot, CircuitState};
pub use table::{CircuitBreakerConfig, CircuitBreakerTable};
