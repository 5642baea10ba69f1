//! Carrier adapter contract and request/response DTOs.
//!
//! Defines the boundary between the provider dispatch layer and the
//! carrier-specific wire adapters (`twilio`, `bandwidth`, `exotel`,
//! `airtel`, `vonage`, or any third-party implementation of
//! [`adapter::CarrierAdapter`]). Adapter internals — HTTP clients, request
//! signing, response parsing — are out of scope here; this crate only
//! fixes the shape adapters must present.

pub mod adapter;
pub mod error;
pub mod testing;
pub mod types;

pub use adapter::CarrierAdapter;
pub use error::{ProviderError, ProviderResult};
pub use types::{
    AvailableNumber, BillingInfo, CapabilityEntry, CustomerInfo, Feature, HealthState,
    NumberSearchRequest, NumberSearchResponse, PortingRequest, PortingResponse, PortingStatus,
    ProviderDescriptor, ProviderHealth, ProviderId, ProviderMetrics, PurchaseRequest,
    PurchaseResponse, PurchaseStatus, RateLimits, RegionCode, RegionSet, ReservationRequest,
    ReservationResponse, ReservationStatus, TransportConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_constants_round_trip_as_str() {
        assert_eq!(Feature::number_search().as_str(), "number_search");
        assert_eq!(Feature::number_porting().as_str(), "number_porting");
    }

    #[test]
    fn region_set_union_promotes_to_all() {
        let a = RegionSet::Set(["US".into()].into_iter().collect());
        let b = RegionSet::All;
        assert_eq!(a.union(b), RegionSet::All);
    }

    #[test]
    fn provider_health_clamps_uptime_into_0_100() {
        let mut health = ProviderHealth::new();
        for _ in 0..5000 {
            health.record_failure();
        }
        assert_eq!(health.uptime_percent, 0.0);
        for _ in 0..5000 {
            health.record_success();
        }
        assert_eq!(health.uptime_percent, 100.0);
    }

    #[test]
    fn provider_health_is_healthy_requires_uptime_above_80() {
        let mut health = ProviderHealth::new();
        health.uptime_percent = 80.0;
        assert!(!health.is_healthy());
        health.uptime_percent = 80.1;
        assert!(health.is_healthy());
    }
}
