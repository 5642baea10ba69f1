use thiserror::Error;

use crate::ProviderId;

/// Error surfaced by a carrier adapter, normalized at the adapter boundary
/// per the propagation policy: every adapter failure becomes one of these
/// variants before the dispatcher ever sees it.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Network/timeout/5xx/rate-limit class of failure. Retryable: the
    /// dispatcher may continue failover to the next provider.
    #[error("transport error from {provider_id}: {message}")]
    TransportError {
        provider_id: ProviderId,
        message: String,
    },

    /// 4xx-class semantic rejection from the carrier (e.g. "number not
    /// available"). Non-retryable against the breaker, but for
    /// search/porting the dispatcher still advances to the next provider;
    /// for reserve/purchase it is surfaced directly.
    #[error("provider business error from {provider_id}: {message}")]
    ProviderBusinessError {
        provider_id: ProviderId,
        message: String,
    },

    /// Injected by the dispatcher when a provider's breaker is OPEN. Never
    /// surfaced to the caller if another adapter succeeds.
    #[error("circuit breaker open for {provider_id}")]
    BreakerOpen { provider_id: ProviderId },

    /// Missing or malformed required fields for the attempted operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Adapter-internal failure with no clearer classification.
    #[error("internal adapter error from {provider_id}: {message}")]
    Internal {
        provider_id: ProviderId,
        message: String,
    },
}

impl ProviderError {
    pub fn provider_id(&self) -> Option<&ProviderId> {
        match self {
            ProviderError::TransportError { provider_id, .. }
            | ProviderError::ProviderBusinessError { provider_id, .. }
            | ProviderError::BreakerOpen { provider_id }
            | ProviderError::Internal { provider_id, .. } => Some(provider_id),
            ProviderError::InvalidRequest(_) => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
