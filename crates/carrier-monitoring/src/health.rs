//! The Health Monitor (§4.7): a background task that probes every
//! registered adapter on an interval and feeds the result back to
//! whatever owns `ProviderHealth` for that provider. Runs independently
//! of dispatch and must never touch the circuit breaker (§4.7, §9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use carrier_providers::{CarrierAdapter, ProviderId};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Implemented by whatever owns `ProviderHealth` for each provider (the
/// dispatcher's per-provider state map). Kept as a narrow trait so this
/// crate never needs to know about breakers or metrics.
pub trait HealthSink: Send + Sync {
    fn record_probe(&self, id: &ProviderId, healthy: bool, response_time_ms: u64);
}

#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    pub interval: Duration,
    /// Upper bound on probes running at once across all providers; a
    /// per-provider guard additionally caps each adapter to one
    /// in-flight probe regardless of this value.
    pub max_concurrent_probes: usize,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent_probes: 8,
        }
    }
}

struct Target {
    id: ProviderId,
    adapter: Arc<dyn CarrierAdapter>,
    in_flight: AsyncMutex<()>,
}

/// Runs `healthProbe()` against every registered adapter on
/// `config.interval`, bounded concurrency, one in-flight probe per
/// adapter. Stopped via `shutdown()`; no pending probe outlives the stop
/// signal by more than one interval (§5).
pub struct HealthMonitor {
    targets: Vec<Arc<Target>>,
    config: HealthMonitorConfig,
    sink: Arc<dyn HealthSink>,
    cancel: CancellationToken,
}

impl HealthMonitor {
    pub fn new(
        adapters: impl IntoIterator<Item = (ProviderId, Arc<dyn CarrierAdapter>)>,
        config: HealthMonitorConfig,
        sink: Arc<dyn HealthSink>,
    ) -> Self {
        let targets = adapters
            .into_iter()
            .map(|(id, adapter)| {
                Arc::new(Target {
                    id,
                    adapter,
                    in_flight: AsyncMutex::new(()),
                })
            })
            .collect();
        Self {
            targets,
            config,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the background polling loop. Returns a handle whose
    /// cancellation token also stops the loop via `shutdown()`.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.clone().probe_all().await;
                    }
                    _ = self.cancel.cancelled() => {
                        info!("health monitor stopping");
                        break;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn probe_all(self: Arc<Self>) {
        let concurrency = self.config.max_concurrent_probes.max(1);
        stream::iter(self.targets.iter().cloned())
            .for_each_concurrent(concurrency, |target| {
                let sink = Arc::clone(&self.sink);
                async move {
                    let Ok(_guard) = target.in_flight.try_lock() else {
                        debug!(provider = %target.id, "skipping overlapping health probe");
                        return;
                    };
                    let start = Instant::now();
                    let healthy = target.adapter.health_probe().await;
                    let elapsed = start.elapsed().as_millis() as u64;
                    if !healthy {
                        warn!(provider = %target.id, "health probe reported unhealthy");
                    }
                    sink.record_probe(&target.id, healthy, elapsed);
                }
            })
            .await;
    }
}

/// In-memory sink used by tests that only care about the last recorded
/// result per provider, without a full `ProviderState` map.
#[derive(Default)]
pub struct RecordingSink {
    records: AsyncMutex<HashMap<ProviderId, (bool, u64)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &ProviderId) -> Option<(bool, u64)> {
        self.records.lock().await.get(id).copied()
    }
}

impl HealthSink for RecordingSink {
    fn record_probe(&self, id: &ProviderId, healthy: bool, response_time_ms: u64) {
        if let Ok(mut records) = self.records.try_lock() {
            records.insert(id.clone(), (healthy, response_time_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carrier_providers::testing::MockAdapter;
    use carrier_providers::{ProviderDescriptor, RegionSet, TransportConfig};
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor(id: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.into(),
            name: id.to_string(),
            priority: 1,
            enabled: true,
            regions: RegionSet::All,
            capabilities: StdHashMap::new(),
            transport: TransportConfig {
                base_url: "https://example.test".to_string(),
                timeout_ms: 1000,
                retry_attempts: 0,
                retry_delay_ms: 0,
                rate_limits: Default::default(),
            },
            credentials: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn probe_all_records_result_per_provider() {
        let adapter: Arc<dyn CarrierAdapter> = Arc::new(
            MockAdapter::new(descriptor("twilio")).with_health_script(vec![false]),
        );
        let sink = Arc::new(RecordingSink::new());
        let monitor = Arc::new(HealthMonitor::new(
            [("twilio".into(), adapter)],
            HealthMonitorConfig {
                interval: Duration::from_secs(3600),
                max_concurrent_probes: 4,
            },
            sink.clone(),
        ));

        monitor.probe_all().await;

        let (healthy, _) = sink.get(&"twilio".into()).await.unwrap();
        assert!(!healthy);
    }

    struct CountingAdapter {
        descriptor: ProviderDescriptor,
        in_flight: std::sync::atomic::AtomicUsize,
        max_observed: AtomicUsize,
    }

    #[async_trait]
    impl CarrierAdapter for CountingAdapter {
        async fn search_numbers(
            &self,
            _req: &carrier_providers::NumberSearchRequest,
        ) -> carrier_providers::ProviderResult<carrier_providers::NumberSearchResponse> {
            unimplemented!()
        }
        async fn reserve_number(
            &self,
            _req: &carrier_providers::ReservationRequest,
        ) -> carrier_providers::ProviderResult<carrier_providers::ReservationResponse> {
            unimplemented!()
        }
        async fn purchase_number(
            &self,
            _req: &carrier_providers::PurchaseRequest,
        ) -> carrier_providers::ProviderResult<carrier_providers::PurchaseResponse> {
            unimplemented!()
        }
        async fn port_number(
            &self,
            _req: &carrier_providers::PortingRequest,
        ) -> carrier_providers::ProviderResult<carrier_providers::PortingResponse> {
            unimplemented!()
        }
        async fn check_number_availability(
            &self,
            _phone_number: &str,
        ) -> carrier_providers::ProviderResult<bool> {
            unimplemented!()
        }
        async fn release_reservation(&self, _reservation_id: &str) -> carrier_providers::ProviderResult<bool> {
            unimplemented!()
        }
        async fn health_probe(&self) -> bool {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            true
        }
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }
    }

    #[tokio::test]
    async fn at_most_one_in_flight_probe_per_adapter() {
        let adapter = Arc::new(CountingAdapter {
            descriptor: descriptor("bandwidth"),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            max_observed: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::new());
        let monitor = Arc::new(HealthMonitor::new(
            [("bandwidth".into(), adapter.clone() as Arc<dyn CarrierAdapter>)],
            HealthMonitorConfig::default(),
            sink,
        ));

        let (a, b) = tokio::join!(monitor.clone().probe_all(), monitor.clone().probe_all());
        let _ = (a, b);

        assert_eq!(adapter.max_observed.load(Ordering::SeqCst), 1);
    }
}
