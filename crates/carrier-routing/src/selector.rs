//! The Selector (§4.3): filters and orders eligible adapters for a given
//! operation. Grounded in the teacher's `ProviderWithHealth` snapshot
//! pattern (`src/routing/strategies.rs`) — candidates are plain data
//! handed in by the caller rather than a trait object, so `select` stays
//! a pure function of its inputs plus the one specified breaker mutation.

use chrono::{DateTime, Utc};

use carrier_providers::ProviderId;

use crate::circuit_breaker::CircuitBreaker;

/// One adapter's observable state at selection time, assembled by the
/// caller (the dispatcher owns the registry and per-provider state; the
/// selector only ever sees this flattened view).
pub struct SelectionCandidate<'a> {
    pub id: ProviderId,
    pub priority: u32,
    /// Position in `Registry::all()` order; breaks priority ties (§4.3.5).
    pub registry_order: usize,
    pub is_healthy: bool,
    pub matches_feature_and_region: bool,
    pub breaker: &'a CircuitBreaker,
}

/// Implements §4.3 steps 1–5. The only mutation permitted is the
/// breaker's own OPEN→HALF_OPEN transition in step 2
/// (`CircuitBreaker::consult_for_selection`).
pub fn select(candidates: &[SelectionCandidate<'_>], now: DateTime<Utc>) -> Vec<ProviderId> {
    let mut eligible: Vec<&SelectionCandidate<'_>> = candidates
        .iter()
        .filter(|c| c.breaker.consult_for_selection(now))
        .filter(|c| c.is_healthy)
        .filter(|c| c.matches_feature_and_region)
        .collect();

    eligible.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.registry_order.cmp(&b.registry_order))
    });

    eligible.into_iter().map(|c| c.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;

    fn candidate<'a>(
        id: &str,
        priority: u32,
        order: usize,
        healthy: bool,
        matches: bool,
        breaker: &'a CircuitBreaker,
    ) -> SelectionCandidate<'a> {
        SelectionCandidate {
            id: id.into(),
            priority,
            registry_order: order,
            is_healthy: healthy,
            matches_feature_and_region: matches,
            breaker,
        }
    }

    #[test]
    fn sorts_by_priority_then_registry_order() {
        let b1 = CircuitBreaker::new(CircuitBreakerConfig::default());
        let b2 = CircuitBreaker::new(CircuitBreakerConfig::default());
        let b3 = CircuitBreaker::new(CircuitBreakerConfig::default());
        let candidates = vec![
            candidate("c", 2, 2, true, true, &b3),
            candidate("a", 1, 0, true, true, &b1),
            candidate("b", 2, 1, true, true, &b2),
        ];
        let result = select(&candidates, Utc::now());
        assert_eq!(
            result.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn excludes_unhealthy_and_mismatched() {
        let b1 = CircuitBreaker::new(CircuitBreakerConfig::default());
        let b2 = CircuitBreaker::new(CircuitBreakerConfig::default());
        let candidates = vec![
            candidate("unhealthy", 1, 0, false, true, &b1),
            candidate("mismatched", 2, 1, true, false, &b2),
        ];
        let result = select(&candidates, Utc::now());
        assert!(result.is_empty());
    }

    #[test]
    fn excludes_open_breaker_before_next_attempt() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            recovery_timeout: std::time::Duration::from_secs(60),
            ..Default::default()
        });
        b.force_open();
        let candidates = vec![candidate("p", 1, 0, true, true, &b)];
        let result = select(&candidates, Utc::now());
        assert!(result.is_empty());
    }
}
