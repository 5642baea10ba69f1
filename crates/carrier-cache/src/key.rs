//! Cache key generation for search requests (§4.5).
//!
//! The key is a canonical serialization of the normalized request with a
//! stable field order, so two requests that are equal but built with
//! fields in a different order (e.g. different `HashMap` iteration order
//! for `features`) still collide on the same key. Long keys fall back to
//! a SHA-256 digest rather than being stored verbatim.

use carrier_providers::NumberSearchRequest;
use sha2::{Digest, Sha256};

const MAX_KEY_LEN: usize = 200;

/// Builds the canonical form of a search request: `|`-joined fields in a
/// fixed order, with `features` sorted so set membership rather than
/// insertion order determines the key.
fn canonical_form(request: &NumberSearchRequest) -> String {
    let mut features = request.features.clone().unwrap_or_default();
    features.sort();

    format!(
        "country={}|area={}|city={}|region={}|pattern={}|features={}|limit={}",
        request.country_code,
        request.area_code.as_deref().unwrap_or(""),
        request.city.as_deref().unwrap_or(""),
        request.region.as_deref().unwrap_or(""),
        request.pattern.as_deref().unwrap_or(""),
        features.join(","),
        request.limit.map(|l| l.to_string()).unwrap_or_default(),
    )
}

/// Deterministic cache key for a search request. Canonical form verbatim
/// when short enough, otherwise its SHA-256 digest (§4.5).
pub fn cache_key(request: &NumberSearchRequest) -> String {
    let canonical = canonical_form(request);
    if canonical.len() <= MAX_KEY_LEN {
        return canonical;
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(country: &str) -> NumberSearchRequest {
        NumberSearchRequest {
            country_code: country.to_string(),
            area_code: Some("415".to_string()),
            city: None,
            region: None,
            pattern: None,
            features: Some(vec!["voice".to_string(), "sms".to_string()]),
            limit: Some(10),
        }
    }

    #[test]
    fn identical_requests_produce_identical_keys() {
        assert_eq!(cache_key(&request("US")), cache_key(&request("US")));
    }

    #[test]
    fn different_countries_produce_different_keys() {
        assert_ne!(cache_key(&request("US")), cache_key(&request("IN")));
    }

    #[test]
    fn feature_order_does_not_affect_key() {
        let mut a = request("US");
        a.features = Some(vec!["sms".to_string(), "voice".to_string()]);
        let mut b = request("US");
        b.features = Some(vec!["voice".to_string(), "sms".to_string()]);

        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn long_canonical_form_falls_back_to_digest() {
        let mut req = request("US");
        req.pattern = Some("x".repeat(300));

        let key = cache_key(&req);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
