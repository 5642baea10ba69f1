//! Configuration loading (§6, §4.1 supplement).
//!
//! Layered TOML + environment source via `figment`, matching the
//! teacher's `Config::from_env` style but upgraded to a real config
//! crate (the teacher pack already depends on `figment`; this is "keep
//! the teacher's way, generalized," not a new dependency). Recognized
//! per-provider and failover options are exactly those named in §6.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use carrier_providers::{
    CapabilityEntry, CarrierAdapter, Feature, ProviderDescriptor, ProviderId, RateLimits,
    RegionCode, RegionSet, TransportConfig,
};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("provider '{0}' enabled in config but no adapter factory registered for it")]
    NoAdapterFactory(String),
}

/// One `[[providers.capabilities]]` entry in the raw config. Kept as a
/// list rather than a map so duplicate `(feature)` entries survive
/// deserialization and can be unioned explicitly (§9 open question 3,
/// e.g. Exotel's source config listing `voice` twice).
#[derive(Debug, Clone, Deserialize)]
struct RawCapability {
    feature: String,
    #[serde(default = "default_true")]
    supported: bool,
    /// Absent or `["*"]` means unrestricted.
    #[serde(default)]
    regions: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct RawRateLimits {
    per_second: Option<u32>,
    per_minute: Option<u32>,
    per_hour: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawProvider {
    id: String,
    name: String,
    priority: u32,
    #[serde(default = "default_true")]
    enabled: bool,
    /// Absent or `["*"]` means unrestricted.
    #[serde(default)]
    regions: Vec<String>,
    #[serde(default)]
    capabilities: Vec<RawCapability>,
    base_url: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default)]
    retry_attempts: u32,
    #[serde(default)]
    retry_delay_ms: u64,
    #[serde(default)]
    rate_limits: Option<RawRateLimits>,
    #[serde(default)]
    credentials: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Failover/global knobs (§6): `maxRetries`, `retryDelayMs`,
/// `healthCheckIntervalMs`, `failoverThresholdPercent`,
/// `circuitBreakerTimeoutMs`.
#[derive(Debug, Clone, Deserialize)]
pub struct FailoverConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_failover_threshold_percent")]
    pub failover_threshold_percent: f64,
    #[serde(default = "default_circuit_breaker_timeout_ms")]
    pub circuit_breaker_timeout_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_health_check_interval_ms() -> u64 {
    60_000
}
fn default_failover_threshold_percent() -> f64 {
    50.0
}
fn default_circuit_breaker_timeout_ms() -> u64 {
    60_000
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            health_check_interval_ms: default_health_check_interval_ms(),
            failover_threshold_percent: default_failover_threshold_percent(),
            circuit_breaker_timeout_ms: default_circuit_breaker_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    providers: Vec<RawProvider>,
    #[serde(default)]
    failover: FailoverConfig,
}

fn region_set(regions: &[String]) -> RegionSet {
    if regions.is_empty() || regions.iter().any(|r| r == "*") {
        RegionSet::All
    } else {
        RegionSet::Set(regions.iter().map(|r| RegionCode::new(r.clone())).collect())
    }
}

/// Unions duplicate `(feature)` capability entries rather than letting
/// the last one silently win (§9 open question 3).
fn dedupe_capabilities(raw: Vec<RawCapability>) -> HashMap<Feature, CapabilityEntry> {
    let mut out: HashMap<Feature, CapabilityEntry> = HashMap::new();
    for cap in raw {
        let feature = Feature::new(cap.feature);
        let regions = region_set(&cap.regions);
        out.entry(feature)
            .and_modify(|existing| {
                existing.supported = existing.supported || cap.supported;
                existing.regions = existing.regions.clone().union(regions.clone());
            })
            .or_insert(CapabilityEntry {
                supported: cap.supported,
                regions,
            });
    }
    out
}

fn into_descriptor(raw: RawProvider) -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderId::new(raw.id),
        name: raw.name,
        priority: raw.priority,
        enabled: raw.enabled,
        regions: region_set(&raw.regions),
        capabilities: dedupe_capabilities(raw.capabilities),
        transport: TransportConfig {
            base_url: raw.base_url,
            timeout_ms: raw.timeout_ms,
            retry_attempts: raw.retry_attempts,
            retry_delay_ms: raw.retry_delay_ms,
            rate_limits: raw.rate_limits.map(|r| RateLimits {
                per_second: r.per_second,
                per_minute: r.per_minute,
                per_hour: r.per_hour,
            }).unwrap_or_default(),
        },
        credentials: raw
            .credentials
            .into_iter()
            .map(|(k, v)| (k, Secret::new(v)))
            .collect(),
    }
}

/// Loaded configuration: validated provider descriptors plus global
/// failover knobs.
pub struct DispatcherConfig {
    pub providers: Vec<ProviderDescriptor>,
    pub failover: FailoverConfig,
}

/// Loads descriptors and failover knobs from a TOML file layered under
/// `CARRIER__`-prefixed environment overrides.
pub fn load(path: impl AsRef<Path>) -> Result<DispatcherConfig, ConfigError> {
    let raw: RawConfig = Figment::new()
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("CARRIER__").split("__"))
        .extract()?;

    Ok(DispatcherConfig {
        providers: raw.providers.into_iter().map(into_descriptor).collect(),
        failover: raw.failover,
    })
}

/// Instantiates one adapter per `enabled` descriptor, keyed by id. The
/// core never hard-codes carrier crates: callers provide the factory for
/// whichever ids their deployment recognizes (`twilio`, `bandwidth`,
/// `exotel`, `airtel`, `vonage`, or any other implementation of
/// [`CarrierAdapter`]).
pub type AdapterFactory =
    HashMap<String, Box<dyn Fn(ProviderDescriptor) -> Arc<dyn CarrierAdapter> + Send + Sync>>;

pub fn instantiate(
    descriptors: Vec<ProviderDescriptor>,
    factory: &AdapterFactory,
) -> Result<Vec<Arc<dyn CarrierAdapter>>, ConfigError> {
    descriptors
        .into_iter()
        .filter(|d| d.enabled)
        .map(|descriptor| {
            let make = factory
                .get(descriptor.id.as_str())
                .ok_or_else(|| ConfigError::NoAdapterFactory(descriptor.id.as_str().to_string()))?;
            Ok(make(descriptor))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn duplicate_capability_entries_are_unioned() {
        let raw = vec![
            RawCapability {
                feature: "voice".to_string(),
                supported: true,
                regions: vec!["US".to_string()],
            },
            RawCapability {
                feature: "voice".to_string(),
                supported: true,
                regions: vec!["IN".to_string()],
            },
        ];
        let caps = dedupe_capabilities(raw);
        let entry = caps.get(&Feature::new("voice")).unwrap();
        match &entry.regions {
            RegionSet::Set(set) => assert_eq!(set.len(), 2),
            RegionSet::All => panic!("expected a bounded region set"),
        }
    }

    #[test]
    fn wildcard_region_in_any_duplicate_promotes_to_all() {
        let raw = vec![
            RawCapability {
                feature: "voice".to_string(),
                supported: true,
                regions: vec!["US".to_string()],
            },
            RawCapability {
                feature: "voice".to_string(),
                supported: true,
                regions: vec!["*".to_string()],
            },
        ];
        let caps = dedupe_capabilities(raw);
        assert_eq!(caps.get(&Feature::new("voice")).unwrap().regions, RegionSet::All);
    }

    #[test]
    fn loads_providers_and_failover_knobs_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[providers]]
            id = "twilio"
            name = "Twilio"
            priority = 1
            enabled = true
            regions = ["US"]
            base_url = "https://api.twilio.com"
            timeout_ms = 4000

            [[providers.capabilities]]
            feature = "number_search"
            supported = true
            regions = ["US"]

            [failover]
            max_retries = 2
            "#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].id.as_str(), "twilio");
        assert_eq!(config.failover.max_retries, 2);
        assert_eq!(config.failover.health_check_interval_ms, default_health_check_interval_ms());
    }
}
