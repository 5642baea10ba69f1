//! Provider Dispatch Layer for telecom number provisioning carriers.
//!
//! Mediates access to multiple third-party carriers (search, reserve,
//! purchase, port, check availability, release) behind one uniform
//! interface. This crate is the dispatch core: the carrier REST
//! adapters, the HTTP service fronting it, porting-state persistence,
//! audit logging, and authentication are host concerns and stay out of
//! scope (§1).
//!
//! - [`carrier_providers`] — the adapter contract and DTOs adapters speak.
//! - [`carrier_routing`] — the selector and per-provider circuit breaker.
//! - [`carrier_cache`] — the idempotent search-result cache.
//! - [`carrier_monitoring`] — the background health probe loop.
//!
//! This crate wires those four into the [`Dispatcher`]: registry,
//! config loading, phone-number country inference, and the dispatch
//! error taxonomy.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod observability;
pub mod phone;
pub mod registry;
pub mod state;

pub use config::{load as load_config, AdapterFactory, ConfigError, DispatcherConfig, FailoverConfig};
pub use dispatcher::{AvailabilityResult, Dispatcher, ProviderHealthSummary};
pub use error::{DispatchError, DispatchResult};
pub use monitor::build_health_monitor;
pub use observability::{init_tracing, TracingConfig};
pub use registry::Registry;

/// Re-exported so downstream crates constructing requests/adapters don't
/// need a direct `carrier_providers` dependency for the common path.
pub use carrier_providers::{
    CarrierAdapter, CustomerInfo, Feature, NumberSearchRequest, NumberSearchResponse,
    PortingRequest, PortingResponse, ProviderDescriptor, ProviderError, ProviderId,
    PurchaseRequest, PurchaseResponse, RegionCode, ReservationRequest, ReservationResponse,
};
