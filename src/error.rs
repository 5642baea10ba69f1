//! Dispatcher-facing error taxonomy (§7).
//!
//! Adapter failures are normalized to `ProviderError` at the adapter
//! boundary (`carrier_providers::error`); this module is one layer up,
//! covering the terminal outcomes the dispatcher itself can produce.

use carrier_providers::{ProviderError, ProviderId};
use thiserror::Error;

/// Terminal or surfaced error from a dispatched operation.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// Every eligible adapter was tried and every attempt failed or was
    /// skipped. Carries the attempted providers and their last errors so
    /// callers can diagnose which carriers were tried (§7).
    #[error("all providers failed for operation {operation}")]
    AllProvidersFailed {
        operation: String,
        attempts: Vec<(ProviderId, ProviderError)>,
    },

    /// A provider-pinned operation named an id absent from the registry.
    #[error("unknown provider: {0}")]
    UnknownProvider(ProviderId),

    /// Missing or malformed required fields for the attempted operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Surfaced directly from a provider-pinned call (reserve, purchase,
    /// release) with no failover attempted.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
