//! Ethiopian MSISDN normalization.
//!
//! The gateway only accepts subscriber numbers in the canonical
//! `+2519XXXXXXXX` form. User-supplied numbers arrive with spaces,
//! dashes, a leading `0`, or a bare nine-digit subscriber part.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phone number already proven to match `+2519` + 8 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Msisdn(String);

impl Msisdn {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalizes a raw phone number, or returns `None` when the input
/// cannot be an Ethiopian mobile number. Callers must reject the
/// operation on `None` instead of forwarding garbage to the gateway.
pub fn normalize_msisdn(raw: &str) -> Option<Msisdn> {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    let digits_after = |s: &str, prefix: &str| s.strip_prefix(prefix).map(str::to_owned);

    let candidate = if let Some(rest) = digits_after(&stripped, "+251") {
        format!("+251{rest}")
    } else if let Some(rest) = digits_after(&stripped, "251") {
        format!("+251{rest}")
    } else if let Some(rest) = digits_after(&stripped, "0") {
        format!("+251{rest}")
    } else if stripped.len() == 9 && stripped.starts_with('9') {
        format!("+251{stripped}")
    } else {
        stripped
    };

    is_canonical(&candidate).then(|| Msisdn(candidate))
}

/// `^\+2519\d{8}$`
fn is_canonical(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("+2519") else {
        return false;
    };
    rest.len() == 8 && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero() {
        assert_eq!(
            normalize_msisdn("0912345678").unwrap().as_str(),
            "+251912345678"
        );
    }

    #[test]
    fn test_country_code_variants() {
        for raw in ["+251912345678", "251912345678", "+251 91 234 5678", "251-912-345-678"] {
            assert_eq!(normalize_msisdn(raw).unwrap().as_str(), "+251912345678", "{raw}");
        }
    }

    #[test]
    fn test_bare_subscriber_number() {
        assert_eq!(
            normalize_msisdn("912345678").unwrap().as_str(),
            "+251912345678"
        );
    }

    #[test]
    fn test_parens_stripped() {
        assert_eq!(
            normalize_msisdn("(0)912345678").unwrap().as_str(),
            "+251912345678"
        );
    }

    #[test]
    fn test_rejects_non_mobile() {
        assert!(normalize_msisdn("0112345678").is_none()); // landline prefix
        assert!(normalize_msisdn("12345").is_none());
        assert!(normalize_msisdn("+25191234567").is_none()); // too short
        assert!(normalize_msisdn("+2519123456789").is_none()); // too long
        assert!(normalize_msisdn("+2519abc45678").is_none());
        assert!(normalize_msisdn("").is_none());
    }

    #[test]
    fn test_fixed_point_on_own_output() {
        let once = normalize_msisdn("0912345678").unwrap();
        let twice = normalize_msisdn(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_every_output_is_canonical() {
        for raw in ["0912345678", "912345678", "251912345678", "+251 912 345 678"] {
            let out = normalize_msisdn(raw).unwrap();
            assert!(is_canonical(out.as_str()));
        }
    }
}
