//! Per-provider state (§3 Ownership, §9): breaker, health, and metrics
//! collapsed into one struct instead of scattered mutexes. The breaker
//! keeps its own internal lock (it is already a complete, reusable
//! concurrency primitive per §5); health and metrics are bundled behind
//! one additional lock since both are mutated together on every
//! dispatched call.

use std::sync::Arc;

use carrier_providers::{CarrierAdapter, ProviderHealth, ProviderMetrics};
use carrier_routing::{CircuitBreaker, CircuitBreakerConfig};
use parking_lot::Mutex;

struct Bundled {
    health: ProviderHealth,
    metrics: ProviderMetrics,
}

/// Everything the dispatch subsystem owns for one registered provider.
pub struct ProviderState {
    pub adapter: Arc<dyn CarrierAdapter>,
    pub breaker: CircuitBreaker,
    /// Position in `Registry::all()` order; breaks selector priority ties.
    pub registry_order: usize,
    bundled: Mutex<Bundled>,
}

impl ProviderState {
    pub fn new(adapter: Arc<dyn CarrierAdapter>, registry_order: usize) -> Self {
        Self::with_breaker_config(adapter, registry_order, CircuitBreakerConfig::default())
    }

    /// Used by the Registry's default constructors and by tests that
    /// need a breaker with non-default thresholds/timeouts (e.g. a
    /// short `recovery_timeout` to exercise half-open recovery without
    /// a 60s sleep).
    pub fn with_breaker_config(
        adapter: Arc<dyn CarrierAdapter>,
        registry_order: usize,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            adapter,
            breaker: CircuitBreaker::new(breaker_config),
            registry_order,
            bundled: Mutex::new(Bundled {
                health: ProviderHealth::new(),
                metrics: ProviderMetrics::new(),
            }),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.bundled.lock().health.is_healthy()
    }

    pub fn health_snapshot(&self) -> ProviderHealth {
        self.bundled.lock().health.clone()
    }

    pub fn metrics_snapshot(&self) -> ProviderMetrics {
        self.bundled.lock().metrics.clone()
    }

    /// Applied to every dispatched request (§3): a success nudges uptime
    /// up and records the call in metrics; a failure nudges uptime down.
    /// This is independent of the circuit breaker, which is updated
    /// separately by whoever wraps the adapter call in `breaker.execute`.
    pub fn record_dispatch_success(&self, response_time_ms: u64) {
        let mut bundled = self.bundled.lock();
        bundled.health.record_success();
        bundled.metrics.record_success(response_time_ms);
    }

    pub fn record_dispatch_failure(&self, response_time_ms: u64, error: impl Into<String>) {
        let mut bundled = self.bundled.lock();
        bundled.health.record_failure();
        bundled.metrics.record_failure(response_time_ms, error);
    }

    /// Applied by the Health Monitor (§4.7): updates health only, never
    /// the breaker, per the requirement that probes not feed dispatch
    /// decisions.
    pub fn record_probe(&self, healthy: bool, response_time_ms: u64) {
        self.bundled.lock().health.record_probe(healthy, response_time_ms);
    }
}
