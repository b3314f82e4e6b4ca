//! Shared type definitions for the wagerline core
//!
//! Canonical identifiers and money helpers used by the ledger, the games and
//! the bonus cascade.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when comparing accumulated floating point money values
pub const MONEY_EPSILON: f64 = 0.01;

/// Opaque account identity resolved by the external identity provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Truncate a money value down to whole cents.
///
/// The small bias absorbs representation error so that `0.29 * 100` still
/// lands on 29 cents.
pub fn round_money(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    ((value * 100.0) + 1e-7).floor() / 100.0
}

/// Round a multiplier to two decimals (half away from zero)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// True when `value` carries at most two decimals
pub fn has_two_decimals(value: f64) -> bool {
    (round2(value) - value).abs() < 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_truncates() {
        assert_eq!(round_money(10.239), 10.23);
        assert_eq!(round_money(0.29), 0.29);
        assert_eq!(round_money(-5.0), 0.0);
        assert_eq!(round_money(f64::NAN), 0.0);
    }

    #[test]
    fn test_round2_and_precision() {
        assert_eq!(round2(99.0 / 7.0), 14.14);
        assert!(has_two_decimals(2.35));
        assert!(!has_two_decimals(2.355));
    }

    #[test]
    fn test_account_id_display() {
        let id = AccountId::from("acc-1");
        assert_eq!(id.to_string(), "acc-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acc-1\"");
    }
}
