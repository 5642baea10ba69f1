//! Wiring between the Health Monitor (`carrier_monitoring`) and this
//! crate's per-provider state (§4.7). The monitor only ever touches
//! `ProviderHealth`; it must never reach the breaker (§9).

use std::sync::Arc;

use carrier_monitoring::{metrics, HealthMonitor, HealthMonitorConfig, HealthSink};
use carrier_providers::ProviderId;

use crate::registry::Registry;

struct RegistryHealthSink {
    registry: Arc<Registry>,
}

impl HealthSink for RegistryHealthSink {
    fn record_probe(&self, id: &ProviderId, healthy: bool, response_time_ms: u64) {
        if let Some(state) = self.registry.get(id) {
            state.record_probe(healthy, response_time_ms);
            let uptime_percent = state.health_snapshot().uptime_percent;
            metrics::record_provider_health(id.as_str(), healthy, uptime_percent);
        }
    }
}

/// Builds a `HealthMonitor` over every adapter currently in `registry`,
/// feeding probe results back into that same registry's per-provider
/// health.
pub fn build_health_monitor(registry: Arc<Registry>, config: HealthMonitorConfig) -> HealthMonitor {
    let adapters = registry
        .all()
        .into_iter()
        .map(|state| (state.adapter.descriptor().id.clone(), state.adapter.clone()))
        .collect::<Vec<_>>();

    let sink = Arc::new(RegistryHealthSink {
        registry: registry.clone(),
    });

    HealthMonitor::new(adapters, config, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_providers::testing::MockAdapter;
    use carrier_providers::{ProviderDescriptor, RegionSet, TransportConfig};
    use std::collections::HashMap;
    use std::time::Duration;

    fn descriptor(id: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.into(),
            name: id.to_string(),
            priority: 1,
            enabled: true,
            regions: RegionSet::All,
            capabilities: HashMap::new(),
            transport: TransportConfig {
                base_url: "https://example.test".to_string(),
                timeout_ms: 1000,
                retry_attempts: 0,
                retry_delay_ms: 0,
                rate_limits: Default::default(),
            },
            credentials: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn probe_result_updates_registry_health_not_breaker() {
        let adapter = Arc::new(
            MockAdapter::new(descriptor("twilio")).with_health_script(vec![false, false, false]),
        );
        let registry = Arc::new(Registry::new(vec![adapter]));
        let monitor = Arc::new(build_health_monitor(
            registry.clone(),
            HealthMonitorConfig {
                interval: Duration::from_millis(10),
                max_concurrent_probes: 4,
            },
        ));

        let handle = monitor.clone().spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.shutdown();
        let _ = handle.await;

        let state = registry.get(&"twilio".into()).unwrap();
        assert!(!state.health_snapshot().is_healthy());
        assert_eq!(
            state.breaker.snapshot().total_requests,
            0,
            "probe failures must never touch the breaker"
        );
    }
}
