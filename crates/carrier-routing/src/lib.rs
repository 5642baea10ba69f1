//! Per-provider circuit breaking and eligible-adapter selection for the
//! provider dispatch layer (§4.3, §4.4).
//!
//! Kept as its own crate the way the teacher splits `llm-edge-routing`
//! out from the agent binary: the breaker state machine and selection
//! algorithm are reusable independent of the dispatcher that drives them.

pub mod circuit_breaker;
pub mod error;
pub mod selector;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
pub use error::BreakerCallError;
pub use selector::{select, SelectionCandidate};
