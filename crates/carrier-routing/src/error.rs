use thiserror::Error;

/// Outcome of `CircuitBreaker::execute`: either the breaker rejected the
/// call outright (OPEN, or HALF_OPEN with no free probe slot) or `f` ran
/// and failed on its own terms.
#[derive(Error, Debug, Clone)]
pub enum BreakerCallError<E> {
    #[error("circuit breaker open")]
    Open,
    #[error(transparent)]
    Inner(E),
}
