//! Scriptable mock adapter for dispatcher/routing tests.
//!
//! Grounded in the pack's pattern of hand-rolled mock providers for routing
//! and cache tests (e.g. the teacher's in-memory provider stand-ins used to
//! exercise `RoutingEngine` without a live HTTP client). Never compiled into
//! a real adapter — §9 explicitly forbids "development mode" branches
//! inside production adapters, so this lives in its own module instead.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::adapter::CarrierAdapter;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{
    AvailableNumber, NumberSearchRequest, NumberSearchResponse, PortingRequest, PortingResponse,
    PortingStatus, ProviderDescriptor, PurchaseRequest, PurchaseResponse, PurchaseStatus,
    ReservationRequest, ReservationResponse, ReservationStatus,
};

/// One scripted outcome for a single call to a [`MockAdapter`].
#[derive(Debug, Clone)]
pub enum ScriptedCall {
    Success,
    Transport(String),
    Business(String),
}

/// A [`CarrierAdapter`] whose responses are scripted in advance, for
/// exercising selector/breaker/dispatcher behavior without a network call.
/// Each `*_script` is consumed front-to-back; once exhausted, calls default
/// to `Success`.
pub struct MockAdapter {
    descriptor: ProviderDescriptor,
    search_script: Mutex<Vec<ScriptedCall>>,
    reserve_script: Mutex<Vec<ScriptedCall>>,
    purchase_script: Mutex<Vec<ScriptedCall>>,
    port_script: Mutex<Vec<ScriptedCall>>,
    health_script: Mutex<Vec<bool>>,
    search_result: Vec<AvailableNumber>,
}

impl MockAdapter {
    pub fn new(descriptor: ProviderDescriptor) -> Self {
        Self {
            descriptor,
            search_script: Mutex::new(Vec::new()),
            reserve_script: Mutex::new(Vec::new()),
            purchase_script: Mutex::new(Vec::new()),
            port_script: Mutex::new(Vec::new()),
            health_script: Mutex::new(Vec::new()),
            search_result: vec![AvailableNumber {
                phone_number: "+12125550100".to_string(),
                friendly_name: None,
                locality: None,
                region: None,
            }],
        }
    }

    pub fn with_search_script(self, script: Vec<ScriptedCall>) -> Self {
        *self.search_script.lock().unwrap() = script;
        self
    }

    pub fn with_reserve_script(self, script: Vec<ScriptedCall>) -> Self {
        *self.reserve_script.lock().unwrap() = script;
        self
    }

    pub fn with_purchase_script(self, script: Vec<ScriptedCall>) -> Self {
        *self.purchase_script.lock().unwrap() = script;
        self
    }

    pub fn with_port_script(self, script: Vec<ScriptedCall>) -> Self {
        *self.port_script.lock().unwrap() = script;
        self
    }

    pub fn with_health_script(self, script: Vec<bool>) -> Self {
        *self.health_script.lock().unwrap() = script;
        self
    }

    fn next(script: &Mutex<Vec<ScriptedCall>>) -> ScriptedCall {
        let mut guard = script.lock().unwrap();
        if guard.is_empty() {
            ScriptedCall::Success
        } else {
            guard.remove(0)
        }
    }

    fn id(&self) -> crate::types::ProviderId {
        self.descriptor.id.clone()
    }
}

#[async_trait]
impl CarrierAdapter for MockAdapter {
    async fn search_numbers(
        &self,
        _req: &NumberSearchRequest,
    ) -> ProviderResult<NumberSearchResponse> {
        match Self::next(&self.search_script) {
            ScriptedCall::Success => Ok(NumberSearchResponse {
                numbers: self.search_result.clone(),
                total_count: self.search_result.len(),
                search_id: Uuid::new_v4().to_string(),
                provider: self.id(),
                response_time_ms: 5,
                cached: false,
            }),
            ScriptedCall::Transport(message) => Err(ProviderError::TransportError {
                provider_id: self.id(),
                message,
            }),
            ScriptedCall::Business(message) => Err(ProviderError::ProviderBusinessError {
                provider_id: self.id(),
                message,
            }),
        }
    }

    async fn reserve_number(
        &self,
        req: &ReservationRequest,
    ) -> ProviderResult<ReservationResponse> {
        match Self::next(&self.reserve_script) {
            ScriptedCall::Success => Ok(ReservationResponse {
                reservation_id: Uuid::new_v4().to_string(),
                phone_number: req.phone_number.clone(),
                provider: self.id(),
                expires_at: Utc::now() + chrono::Duration::minutes(req.duration_minutes as i64),
                status: ReservationStatus::Reserved,
            }),
            ScriptedCall::Transport(message) => Err(ProviderError::TransportError {
                provider_id: self.id(),
                message,
            }),
            ScriptedCall::Business(_message) => Ok(ReservationResponse {
                reservation_id: Uuid::new_v4().to_string(),
                phone_number: req.phone_number.clone(),
                provider: self.id(),
                expires_at: Utc::now(),
                status: ReservationStatus::Failed,
            }),
        }
    }

    async fn purchase_number(&self, _req: &PurchaseRequest) -> ProviderResult<PurchaseResponse> {
        match Self::next(&self.purchase_script) {
            ScriptedCall::Success => Ok(PurchaseResponse {
                purchase_id: Uuid::new_v4().to_string(),
                status: PurchaseStatus::Purchased,
                activation_date: Some(Utc::now()),
                monthly_rate: 1.0,
                setup_fee: 0.0,
                features: vec!["voice".to_string(), "sms".to_string()],
            }),
            ScriptedCall::Transport(message) => Err(ProviderError::TransportError {
                provider_id: self.id(),
                message,
            }),
            ScriptedCall::Business(_message) => Ok(PurchaseResponse {
                purchase_id: Uuid::new_v4().to_string(),
                status: PurchaseStatus::Failed,
                activation_date: None,
                monthly_rate: 0.0,
                setup_fee: 0.0,
                features: Vec::new(),
            }),
        }
    }

    async fn port_number(&self, _req: &PortingRequest) -> ProviderResult<PortingResponse> {
        match Self::next(&self.port_script) {
            ScriptedCall::Success => Ok(PortingResponse {
                porting_id: Uuid::new_v4().to_string(),
                status: PortingStatus::Submitted,
                estimated_completion: Some(Utc::now() + chrono::Duration::days(3)),
                rejection_reason: None,
            }),
            ScriptedCall::Transport(message) => Err(ProviderError::TransportError {
                provider_id: self.id(),
                message,
            }),
            ScriptedCall::Business(reason) => Ok(PortingResponse {
                porting_id: Uuid::new_v4().to_string(),
                status: PortingStatus::Rejected,
                estimated_completion: None,
                rejection_reason: Some(reason),
            }),
        }
    }

    async fn check_number_availability(&self, _phone_number: &str) -> ProviderResult<bool> {
        Ok(true)
    }

    async fn release_reservation(&self, _reservation_id: &str) -> ProviderResult<bool> {
        Ok(true)
    }

    async fn health_probe(&self) -> bool {
        let mut guard = self.health_script.lock().unwrap();
        if guard.is_empty() {
            true
        } else {
            guard.remove(0)
        }
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegionSet, TransportConfig};
    use std::collections::HashMap;

    fn descriptor(id: &str, priority: u32) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.into(),
            name: id.to_string(),
            priority,
            enabled: true,
            regions: RegionSet::All,
            capabilities: HashMap::new(),
            transport: TransportConfig {
                base_url: "https://example.test".to_string(),
                timeout_ms: 5000,
                retry_attempts: 0,
                retry_delay_ms: 0,
                rate_limits: Default::default(),
            },
            credentials: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn scripted_transport_failure_is_returned_as_transport_error() {
        let adapter = MockAdapter::new(descriptor("twilio", 1))
            .with_search_script(vec![ScriptedCall::Transport("boom".to_string())]);
        let req = NumberSearchRequest {
            country_code: "US".to_string(),
            area_code: None,
            city: None,
            region: None,
            pattern: None,
            features: None,
            limit: None,
        };
        let err = adapter.search_numbers(&req).await.unwrap_err();
        assert!(matches!(err, ProviderError::TransportError { .. }));
    }

    #[tokio::test]
    async fn unscripted_calls_default_to_success() {
        let adapter = MockAdapter::new(descriptor("bandwidth", 2));
        let req = NumberSearchRequest {
            country_code: "US".to_string(),
            area_code: None,
            city: None,
            region: None,
            pattern: None,
            features: None,
            limit: None,
        };
        let resp = adapter.search_numbers(&req).await.unwrap();
        assert!(!resp.cached);
        assert_eq!(resp.numbers.len(), 1);
    }
}
