use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::Secret;
use serde::{Deserialize, Serialize};

/// Stable identifier for a carrier, e.g. `twilio`, `bandwidth`. Newtype over
/// an `Arc<str>` so cloning an id at call sites (selector output, error
/// attempts list, metrics maps) never re-allocates the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

/// ISO-ish region code, e.g. `US`, `IN`. Kept distinct from `ProviderId` and
/// `Feature` so the compiler catches a region passed where a feature name
/// was meant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(Arc<str>);

impl RegionCode {
    pub fn new(region: impl Into<Arc<str>>) -> Self {
        Self(region.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionCode {
    fn from(s: &str) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

impl From<String> for RegionCode {
    fn from(s: String) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

/// Open string newtype for capability names. Not a closed enum: the
/// registry must accept adapters exposing features beyond the ones named
/// here (the glossary lists `sms`/`voice` alongside the five number
/// operations).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(Arc<str>);

impl Feature {
    pub fn new(feature: impl Into<Arc<str>>) -> Self {
        Self(feature.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn number_search() -> Self {
        Self::new("number_search")
    }

    pub fn number_reservation() -> Self {
        Self::new("number_reservation")
    }

    pub fn number_purchase() -> Self {
        Self::new("number_purchase")
    }

    pub fn number_porting() -> Self {
        Self::new("number_porting")
    }

    pub fn number_availability() -> Self {
        Self::new("number_availability")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Feature {
    fn from(s: &str) -> Self {
        Self::new(Arc::<str>::from(s))
    }
}

/// Region restriction on a single capability entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSet {
    All,
    Set(HashSet<RegionCode>),
}

impl RegionSet {
    pub fn contains(&self, region: &RegionCode) -> bool {
        match self {
            RegionSet::All => true,
            RegionSet::Set(set) => set.contains(region),
        }
    }

    /// Union two region sets, used to deduplicate repeated capability
    /// entries for the same `(provider, feature)` pair at load time.
    pub fn union(self, other: RegionSet) -> RegionSet {
        match (self, other) {
            (RegionSet::All, _) | (_, RegionSet::All) => RegionSet::All,
            (RegionSet::Set(mut a), RegionSet::Set(b)) => {
                a.extend(b);
                RegionSet::Set(a)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub supported: bool,
    pub regions: RegionSet,
}

/// Transport-level hints for an adapter; opaque to the dispatch core beyond
/// the timeout it enforces via `tokio::time::timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub rate_limits: RateLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimits {
    pub per_second: Option<u32>,
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
}

/// Static, per-process-lifetime configuration for one carrier. Immutable
/// after Registry load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub name: String,
    pub priority: u32,
    pub enabled: bool,
    pub regions: RegionSet,
    pub capabilities: HashMap<Feature, CapabilityEntry>,
    pub transport: TransportConfig,
    /// Opaque to the core: held only to hand to the adapter at
    /// construction time, never logged or matched on.
    #[serde(skip)]
    pub credentials: HashMap<String, Secret<String>>,
}

impl ProviderDescriptor {
    pub fn supports_feature(&self, feature: &Feature, region: Option<&RegionCode>) -> bool {
        let Some(entry) = self.capabilities.get(feature) else {
            return false;
        };
        if !entry.supported {
            return false;
        }
        match region {
            None => true,
            Some(region) => entry.regions.contains(region),
        }
    }

    pub fn supports_region(&self, region: &RegionCode) -> bool {
        self.regions.contains(region)
    }
}

/// Dynamic per-provider health, owned by its adapter, mutated by the health
/// monitor and by every dispatched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub status: HealthState,
    pub last_check_at: DateTime<Utc>,
    pub last_response_time_ms: u64,
    pub uptime_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl ProviderHealth {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            last_check_at: Utc::now(),
            last_response_time_ms: 0,
            uptime_percent: 100.0,
        }
    }

    /// `status=healthy` is eligible only once uptime clears 80%.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy && self.uptime_percent > 80.0
    }

    pub fn record_success(&mut self) {
        self.uptime_percent = (self.uptime_percent + 0.1).min(100.0);
    }

    pub fn record_failure(&mut self) {
        self.uptime_percent = (self.uptime_percent - 1.0).max(0.0);
    }

    pub fn record_probe(&mut self, healthy: bool, response_time_ms: u64) {
        self.last_check_at = Utc::now();
        self.last_response_time_ms = response_time_ms;
        self.status = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        if healthy {
            self.record_success();
        } else {
            self.record_failure();
        }
    }
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic counters plus rolling averages, updated atomically per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: f64,
    pub error_rate_percent: f64,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ProviderMetrics {
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            avg_response_time_ms: 0.0,
            error_rate_percent: 0.0,
            last_error: None,
            last_success_at: None,
        }
    }

    pub fn record_success(&mut self, response_time_ms: u64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.update_avg_response_time(response_time_ms);
        self.update_error_rate();
        self.last_success_at = Some(Utc::now());
    }

    pub fn record_failure(&mut self, response_time_ms: u64, error: impl Into<String>) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.update_avg_response_time(response_time_ms);
        self.update_error_rate();
        self.last_error = Some(error.into());
    }

    fn update_avg_response_time(&mut self, sample_ms: u64) {
        let n = self.total_requests as f64;
        self.avg_response_time_ms += (sample_ms as f64 - self.avg_response_time_ms) / n;
    }

    fn update_error_rate(&mut self) {
        self.error_rate_percent = if self.total_requests == 0 {
            0.0
        } else {
            (self.failed_requests as f64 / self.total_requests as f64) * 100.0
        };
    }
}

impl Default for ProviderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingInfo {
    pub payment_method_id: Option<String>,
    pub billing_address: Option<String>,
}

// --- Request/response DTOs (§3) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberSearchRequest {
    pub country_code: String,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableNumber {
    pub phone_number: String,
    pub friendly_name: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberSearchResponse {
    pub numbers: Vec<AvailableNumber>,
    pub total_count: usize,
    pub search_id: String,
    pub provider: ProviderId,
    pub response_time_ms: u64,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub phone_number: String,
    pub provider_id: ProviderId,
    pub duration_minutes: u32,
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub phone_number: String,
    pub provider: ProviderId,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub phone_number: String,
    pub provider_id: ProviderId,
    #[serde(default)]
    pub reservation_id: Option<String>,
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Purchased,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub purchase_id: String,
    pub status: PurchaseStatus,
    pub activation_date: Option<DateTime<Utc>>,
    pub monthly_rate: f64,
    pub setup_fee: f64,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortingRequest {
    pub phone_number: String,
    pub current_provider: String,
    pub account_number: String,
    pub pin: String,
    pub authorized_name: String,
    pub service_address: String,
    #[serde(default)]
    pub documents: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortingStatus {
    Submitted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortingResponse {
    pub porting_id: String,
    pub status: PortingStatus,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}
