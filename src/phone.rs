//! E.164 country inference (§6).
//!
//! Deliberately partial, matching the source's own recognized prefixes
//! (§9 open question 2): only `+1` (US, 11 digits total) and `+91` (IN,
//! 12 digits total) resolve. Anything else is an `InvalidRequest` rather
//! than a silent default — the distillation's ambiguity is tightened,
//! not guessed at.

use carrier_providers::RegionCode;

use crate::error::DispatchError;

/// Resolves the region a phone number belongs to from its E.164 prefix.
pub fn infer_region(phone_number: &str) -> Result<RegionCode, DispatchError> {
    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();

    if phone_number.starts_with("+1") && digits.len() == 11 {
        return Ok(RegionCode::new("US"));
    }
    if phone_number.starts_with("+91") && digits.len() == 12 {
        return Ok(RegionCode::new("IN"));
    }

    Err(DispatchError::InvalidRequest(format!(
        "unrecognized E.164 prefix for phone number {phone_number}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_us_prefix() {
        assert_eq!(infer_region("+12125550100").unwrap().as_str(), "US");
    }

    #[test]
    fn recognizes_in_prefix() {
        assert_eq!(infer_region("+919876543210").unwrap().as_str(), "IN");
    }

    #[test]
    fn rejects_unrecognized_prefix() {
        assert!(infer_region("+442071234567").is_err());
    }

    #[test]
    fn rejects_wrong_length_for_us() {
        assert!(infer_region("+1212555010").is_err());
    }
}
