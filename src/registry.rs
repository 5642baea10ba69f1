//! The Provider Registry (§4.1).
//!
//! Immutable after construction: dynamic re-registration is a
//! non-goal. Exposes `get(id)` and `all()` in stable registration
//! order. The primary, test-friendly constructor is dependency
//! injection (`Registry::new`, taking adapter instances directly) per
//! §9's re-architecture guidance — no private mutable map for tests to
//! reach into.

use std::collections::HashMap;
use std::sync::Arc;

use carrier_providers::{CarrierAdapter, ProviderId};
use carrier_routing::CircuitBreakerConfig;

use crate::config::{self, AdapterFactory, ConfigError};
use crate::state::ProviderState;

/// Immutable, process-lifetime registry of carrier adapters and their
/// per-provider dispatch state (breaker, health, metrics — §3
/// Ownership).
pub struct Registry {
    order: Vec<ProviderId>,
    by_id: HashMap<ProviderId, Arc<ProviderState>>,
}

impl Registry {
    /// Dependency-injection constructor: the primary, test-friendly
    /// path. Registration order is preserved for selector tie-breaking
    /// (§4.3 step 5).
    pub fn new(adapters: Vec<Arc<dyn CarrierAdapter>>) -> Self {
        let mut order = Vec::with_capacity(adapters.len());
        let mut by_id = HashMap::with_capacity(adapters.len());
        for (index, adapter) in adapters.into_iter().enumerate() {
            let id = adapter.descriptor().id.clone();
            order.push(id.clone());
            by_id.insert(id, Arc::new(ProviderState::new(adapter, index)));
        }
        Self { order, by_id }
    }

    /// Like [`Self::new`], but every provider's breaker is built from
    /// `breaker_config` instead of the spec defaults. Used by tests that
    /// need a short `recovery_timeout` to exercise half-open recovery
    /// without sleeping 60 real seconds.
    pub fn new_with_breaker_config(
        adapters: Vec<Arc<dyn CarrierAdapter>>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let mut order = Vec::with_capacity(adapters.len());
        let mut by_id = HashMap::with_capacity(adapters.len());
        for (index, adapter) in adapters.into_iter().enumerate() {
            let id = adapter.descriptor().id.clone();
            order.push(id.clone());
            by_id.insert(
                id,
                Arc::new(ProviderState::with_breaker_config(
                    adapter,
                    index,
                    breaker_config.clone(),
                )),
            );
        }
        Self { order, by_id }
    }

    /// Loads descriptors from `path`, instantiates one adapter per
    /// `enabled=true` descriptor via `factory`, and builds the registry
    /// in descriptor order (§4.1).
    pub fn from_config(
        path: impl AsRef<std::path::Path>,
        factory: &AdapterFactory,
    ) -> Result<Self, ConfigError> {
        let loaded = config::load(path)?;
        let adapters = config::instantiate(loaded.providers, factory)?;
        Ok(Self::new(adapters))
    }

    pub fn get(&self, id: &ProviderId) -> Option<&Arc<ProviderState>> {
        self.by_id.get(id)
    }

    /// All registered providers, in stable registration order.
    pub fn all(&self) -> Vec<&Arc<ProviderState>> {
        self.order.iter().filter_map(|id| self.by_id.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_providers::testing::MockAdapter;
    use carrier_providers::{ProviderDescriptor, RegionSet, TransportConfig};
    use std::collections::HashMap as StdHashMap;

    fn descriptor(id: &str, priority: u32) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.into(),
            name: id.to_string(),
            priority,
            enabled: true,
            regions: RegionSet::All,
            capabilities: StdHashMap::new(),
            transport: TransportConfig {
                base_url: "https://example.test".to_string(),
                timeout_ms: 5000,
                retry_attempts: 0,
                retry_delay_ms: 0,
                rate_limits: Default::default(),
            },
            credentials: StdHashMap::new(),
        }
    }

    #[test]
    fn get_and_all_preserve_registration_order() {
        let registry = Registry::new(vec![
            Arc::new(MockAdapter::new(descriptor("twilio", 1))),
            Arc::new(MockAdapter::new(descriptor("bandwidth", 2))),
        ]);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&"twilio".into()).is_some());
        assert!(registry.get(&"unknown".into()).is_none());

        let ids: Vec<_> = registry
            .all()
            .iter()
            .map(|s| s.adapter.descriptor().id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["twilio", "bandwidth"]);
    }
}
