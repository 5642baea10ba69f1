//! Background health probing and metrics emission for the provider
//! dispatch layer (§4.7, §4.8).

pub mod health;
pub mod metrics;

pub use health::{HealthMonitor, HealthMonitorConfig, HealthSink, RecordingSink};
