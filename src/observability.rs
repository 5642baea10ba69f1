//! Structured logging setup (§2 ambient stack). The HTTP service and its
//! export pipeline are out of scope (§1); this crate only owns the
//! `tracing` subscriber init so dispatch, selection, and breaker
//! transitions emit structured spans/events regardless of what fronts
//! this core.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub json: bool,
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: "info,carrier_dispatch=debug".to_string(),
        }
    }
}

/// Initializes the global `tracing` subscriber. Idempotent across test
/// binaries is the caller's concern (tests typically call this once via
/// `std::sync::Once` or accept the "already set" error silently).
pub fn init_tracing(config: TracingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.clone()));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_debug_for_this_crate() {
        let config = TracingConfig::default();
        assert!(config.default_filter.contains("carrier_dispatch=debug"));
        assert!(!config.json);
    }
}
