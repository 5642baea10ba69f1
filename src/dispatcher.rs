//! The Dispatcher (§4.6): orchestrates selection, caching, the circuit
//! breaker, and sequential failover across the registry's adapters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use carrier_cache::{cache_key, ResultCache};
use carrier_monitoring::metrics;
use carrier_providers::{
    Feature, HealthState, NumberSearchRequest, NumberSearchResponse, PortingRequest,
    PortingResponse, ProviderError, ProviderId, ProviderMetrics, PurchaseRequest, PurchaseResponse,
    RegionCode, ReservationRequest, ReservationResponse,
};
use carrier_routing::{select, BreakerCallError, CircuitState, SelectionCandidate};
use chrono::Utc;
use tracing::{instrument, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::registry::Registry;
use crate::state::ProviderState;

fn breaker_state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

/// Snapshot returned by `provider_health()` (§6).
#[derive(Debug, Clone)]
pub struct ProviderHealthSummary {
    pub healthy: bool,
    pub status: HealthState,
    pub uptime_percent: f64,
}

/// Result of `check_number_availability()` (§6).
#[derive(Debug, Clone)]
pub struct AvailabilityResult {
    pub available: bool,
    pub provider_id: Option<ProviderId>,
}

/// The Provider Dispatch Layer's single programmatic surface (§6).
pub struct Dispatcher {
    registry: Arc<Registry>,
    cache: ResultCache,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, cache: ResultCache) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Builds the ordered candidate list for `feature`/`region`, deferring
    /// the breaker OPEN→HALF_OPEN check and priority sort to
    /// `carrier_routing::select` (§4.3).
    fn eligible_providers(&self, feature: &Feature, region: Option<&RegionCode>) -> Vec<ProviderId> {
        let states = self.registry.all();
        let candidates: Vec<SelectionCandidate<'_>> = states
            .iter()
            .map(|state| {
                let descriptor = state.adapter.descriptor();
                let matches = state.adapter.supports_feature(feature, region)
                    && region.map(|r| state.adapter.supports_region(r)).unwrap_or(true);
                SelectionCandidate {
                    id: descriptor.id.clone(),
                    priority: descriptor.priority,
                    registry_order: state.registry_order,
                    is_healthy: state.is_healthy(),
                    matches_feature_and_region: matches,
                    breaker: &state.breaker,
                }
            })
            .collect();
        select(&candidates, Utc::now())
    }

    fn timeout_for(&self, state: &ProviderState) -> Duration {
        Duration::from_millis(state.adapter.descriptor().transport.timeout_ms)
    }

    /// Runs `fut` under the provider's deadline, normalizing an elapsed
    /// deadline to a retryable `TransportError` (§5 cancellation &
    /// timeouts).
    async fn with_deadline<T>(
        &self,
        state: &ProviderState,
        provider_id: &ProviderId,
        fut: impl std::future::Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.timeout_for(state), fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::TransportError {
                provider_id: provider_id.clone(),
                message: "adapter call exceeded configured timeout".to_string(),
            }),
        }
    }

    /// Wraps an adapter call in its breaker and records the outcome into
    /// the provider's health/metrics (§3, §5 ordering guarantee: breaker
    /// check → adapter call → breaker update is atomic w.r.t. other calls
    /// to the same breaker).
    async fn call_adapter<T>(
        &self,
        state: &ProviderState,
        provider_id: &ProviderId,
        fut: impl std::future::Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, BreakerCallError<ProviderError>> {
        let start = Instant::now();
        let deadline_fut = self.with_deadline(state, provider_id, fut);
        let result = state.breaker.execute(|| deadline_fut).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                state.record_dispatch_success(elapsed_ms);
                metrics::record_call(provider_id.as_str(), true, elapsed_ms);
            }
            Err(BreakerCallError::Inner(err)) => {
                state.record_dispatch_failure(elapsed_ms, err.to_string());
                metrics::record_call(provider_id.as_str(), false, elapsed_ms);
            }
            Err(BreakerCallError::Open) => {}
        }
        metrics::record_breaker_state(provider_id.as_str(), breaker_state_label(state.breaker.state()));
        result
    }

    /// `searchNumbers(req)` (§4.6 step 1-4). `ttl` overrides the default
    /// 300s cache TTL for this call only (§4.5).
    #[instrument(skip(self, req))]
    pub async fn search_numbers(
        &self,
        req: NumberSearchRequest,
        ttl: Option<Duration>,
    ) -> DispatchResult<NumberSearchResponse> {
        if req.country_code.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "countryCode is required for number search".to_string(),
            ));
        }

        let key = cache_key(&req);
        if let Some(hit) = self.cache.get(&key).await {
            metrics::record_cache_operation(true);
            return Ok(hit);
        }
        metrics::record_cache_operation(false);

        let region = RegionCode::new(req.country_code.clone());
        let ids = self.eligible_providers(&Feature::number_search(), Some(&region));

        let mut attempts = Vec::new();
        for id in ids {
            let Some(state) = self.registry.get(&id) else {
                continue;
            };
            match self
                .call_adapter(state, &id, state.adapter.search_numbers(&req))
                .await
            {
                Ok(response) => {
                    self.cache
                        .put_with(key, response.clone(), ttl.unwrap_or(carrier_cache::DEFAULT_TTL), Vec::new())
                        .await;
                    return Ok(response);
                }
                Err(BreakerCallError::Open) => {
                    warn!(provider = %id, "skipping provider with open breaker");
                    continue;
                }
                Err(BreakerCallError::Inner(err)) => {
                    attempts.push((id, err));
                    continue;
                }
            }
        }

        Err(DispatchError::AllProvidersFailed {
            operation: "number_search".to_string(),
            attempts,
        })
    }

    /// `reserveNumber(req)` (§4.6): provider-pinned, no failover (§8
    /// invariant 4).
    #[instrument(skip(self, req))]
    pub async fn reserve_number(
        &self,
        req: ReservationRequest,
    ) -> DispatchResult<ReservationResponse> {
        if req.phone_number.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "phoneNumber is required for reservation".to_string(),
            ));
        }
        let provider_id = req.provider_id.clone();
        let state = self
            .registry
            .get(&provider_id)
            .ok_or_else(|| DispatchError::UnknownProvider(provider_id.clone()))?;

        self.call_adapter(state, &provider_id, state.adapter.reserve_number(&req))
            .await
            .map_err(|err| match err {
                BreakerCallError::Open => {
                    DispatchError::Provider(ProviderError::BreakerOpen { provider_id })
                }
                BreakerCallError::Inner(err) => DispatchError::Provider(err),
            })
    }

    /// `purchaseNumber(req)` (§4.6): provider-pinned, no failover.
    #[instrument(skip(self, req))]
    pub async fn purchase_number(&self, req: PurchaseRequest) -> DispatchResult<PurchaseResponse> {
        if req.phone_number.trim().is_empty() || req.customer_info.name.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "phoneNumber and customerInfo are required for purchase".to_string(),
            ));
        }
        let provider_id = req.provider_id.clone();
        let state = self
            .registry
            .get(&provider_id)
            .ok_or_else(|| DispatchError::UnknownProvider(provider_id.clone()))?;

        self.call_adapter(state, &provider_id, state.adapter.purchase_number(&req))
            .await
            .map_err(|err| match err {
                BreakerCallError::Open => {
                    DispatchError::Provider(ProviderError::BreakerOpen { provider_id })
                }
                BreakerCallError::Inner(err) => DispatchError::Provider(err),
            })
    }

    /// `portNumber(req)` (§4.6): failover pattern using
    /// `"number_porting"` and the country inferred from the phone number.
    /// A `status=rejected` response is returned, not retried.
    #[instrument(skip(self, req))]
    pub async fn port_number(&self, req: PortingRequest) -> DispatchResult<PortingResponse> {
        let region = crate::phone::infer_region(&req.phone_number)?;
        let ids = self.eligible_providers(&Feature::number_porting(), Some(&region));

        let mut attempts = Vec::new();
        for id in ids {
            let Some(state) = self.registry.get(&id) else {
                continue;
            };
            match self
                .call_adapter(state, &id, state.adapter.port_number(&req))
                .await
            {
                Ok(response) => return Ok(response),
                Err(BreakerCallError::Open) => continue,
                Err(BreakerCallError::Inner(err)) => {
                    attempts.push((id, err));
                    continue;
                }
            }
        }

        Err(DispatchError::AllProvidersFailed {
            operation: "number_porting".to_string(),
            attempts,
        })
    }

    /// `checkNumberAvailability(phoneNumber)` (§4.6): failover across
    /// adapters supporting `number_search` in the inferred country.
    #[instrument(skip(self))]
    pub async fn check_number_availability(
        &self,
        phone_number: &str,
    ) -> DispatchResult<AvailabilityResult> {
        let region = crate::phone::infer_region(phone_number)?;
        let ids = self.eligible_providers(&Feature::number_search(), Some(&region));

        let mut attempts = Vec::new();
        for id in ids {
            let Some(state) = self.registry.get(&id) else {
                continue;
            };
            match self
                .call_adapter(
                    state,
                    &id,
                    state.adapter.check_number_availability(phone_number),
                )
                .await
            {
                Ok(available) => {
                    return Ok(AvailabilityResult {
                        available,
                        provider_id: Some(id),
                    })
                }
                Err(BreakerCallError::Open) => continue,
                Err(BreakerCallError::Inner(err)) => {
                    attempts.push((id, err));
                    continue;
                }
            }
        }

        Err(DispatchError::AllProvidersFailed {
            operation: "number_availability".to_string(),
            attempts,
        })
    }

    /// `releaseReservation(providerId, reservationId)` (§4.6):
    /// provider-pinned.
    #[instrument(skip(self))]
    pub async fn release_reservation(
        &self,
        provider_id: &ProviderId,
        reservation_id: &str,
    ) -> DispatchResult<bool> {
        let state = self
            .registry
            .get(provider_id)
            .ok_or_else(|| DispatchError::UnknownProvider(provider_id.clone()))?;

        self.call_adapter(
            state,
            provider_id,
            state.adapter.release_reservation(reservation_id),
        )
        .await
        .map_err(|err| match err {
            BreakerCallError::Open => {
                DispatchError::Provider(ProviderError::BreakerOpen {
                    provider_id: provider_id.clone(),
                })
            }
            BreakerCallError::Inner(err) => DispatchError::Provider(err),
        })
    }

    /// `providerHealth()` (§6): mapping id → {healthy, status, uptimePercent}.
    pub fn provider_health(&self) -> Vec<(ProviderId, ProviderHealthSummary)> {
        self.registry
            .all()
            .iter()
            .map(|state| {
                let health = state.health_snapshot();
                (
                    state.adapter.descriptor().id.clone(),
                    ProviderHealthSummary {
                        healthy: health.is_healthy(),
                        status: health.status,
                        uptime_percent: health.uptime_percent,
                    },
                )
            })
            .collect()
    }

    /// `providerMetrics()` (§6): mapping id → `ProviderMetrics` snapshot.
    pub fn provider_metrics(&self) -> Vec<(ProviderId, ProviderMetrics)> {
        self.registry
            .all()
            .iter()
            .map(|state| (state.adapter.descriptor().id.clone(), state.metrics_snapshot()))
            .collect()
    }
}
