use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::{
    Feature, NumberSearchRequest, NumberSearchResponse, PortingRequest, PortingResponse,
    ProviderDescriptor, ProviderMetrics, PurchaseRequest, PurchaseResponse, RegionCode,
    ReservationRequest, ReservationResponse,
};

/// Capability set every carrier adapter is polymorphic over (§4.2). The
/// core treats adapters as wire-format translators; everything past this
/// boundary is out of scope.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// Lazy, bounded-size search for available numbers.
    async fn search_numbers(&self, req: &NumberSearchRequest) -> ProviderResult<NumberSearchResponse>;

    async fn reserve_number(&self, req: &ReservationRequest) -> ProviderResult<ReservationResponse>;

    async fn purchase_number(&self, req: &PurchaseRequest) -> ProviderResult<PurchaseResponse>;

    async fn port_number(&self, req: &PortingRequest) -> ProviderResult<PortingResponse>;

    async fn check_number_availability(&self, phone_number: &str) -> ProviderResult<bool>;

    async fn release_reservation(&self, reservation_id: &str) -> ProviderResult<bool>;

    /// Cheap liveness check, no side effects.
    async fn health_probe(&self) -> bool;

    fn descriptor(&self) -> &ProviderDescriptor;

    /// True iff the capability is present and either unrestricted or
    /// `region` is within the capability's region set.
    fn supports_feature(&self, feature: &Feature, region: Option<&RegionCode>) -> bool {
        self.descriptor().supports_feature(feature, region)
    }

    /// True iff `region` is within the descriptor's region set or the
    /// descriptor is wildcard.
    fn supports_region(&self, region: &RegionCode) -> bool {
        self.descriptor().supports_region(region)
    }

    /// A snapshot of this adapter's own view of its metrics, if it tracks
    /// one. The authoritative counters consulted by `providerMetrics()`
    /// live in the per-provider `ProviderState` the dispatch subsystem
    /// owns (§3 Ownership); this default is for adapters with no internal
    /// bookkeeping of their own.
    fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics::default()
    }
}
