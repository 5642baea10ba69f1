//! `metrics` facade emission (§4.8): a side channel mirroring the
//! structured `ProviderMetrics` snapshot that remains the source of
//! truth returned to callers. Scraping/export is the host's concern and
//! stays out of scope; only the emission point lives here, the way the
//! teacher's `llm-edge-monitoring::metrics` emits alongside its own
//! snapshot types.

use metrics::{counter, gauge, histogram};

/// Records one dispatched call's outcome for a provider.
pub fn record_call(provider_id: &str, success: bool, response_time_ms: u64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "carrier_dispatch_requests_total",
        "provider" => provider_id.to_string(),
        "status" => status,
    )
    .increment(1);
    histogram!(
        "carrier_dispatch_request_duration_ms",
        "provider" => provider_id.to_string(),
    )
    .record(response_time_ms as f64);
}

/// Records a circuit breaker state transition.
pub fn record_breaker_state(provider_id: &str, state: &str) {
    gauge!(
        "carrier_dispatch_breaker_state",
        "provider" => provider_id.to_string(),
        "state" => state.to_string(),
    )
    .set(1.0);
}

/// Records a cache operation outcome for the result cache (§4.5).
pub fn record_cache_operation(hit: bool) {
    let op = if hit { "hit" } else { "miss" };
    counter!("carrier_dispatch_cache_total", "result" => op).increment(1);
}

/// Records provider health as observed by the Health Monitor (§4.7).
pub fn record_provider_health(provider_id: &str, is_healthy: bool, uptime_percent: f64) {
    gauge!(
        "carrier_dispatch_provider_healthy",
        "provider" => provider_id.to_string(),
    )
    .set(if is_healthy { 1.0 } else { 0.0 });
    gauge!(
        "carrier_dispatch_provider_uptime_percent",
        "provider" => provider_id.to_string(),
    )
    .set(uptime_percent);
}
