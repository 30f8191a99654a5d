//! Fixed-point monetary value in Ethiopian birr.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// ISO code for the single supported currency.
pub const CURRENCY_CODE: &str = "ETB";

/// Minor units (santim) per birr.
const MINOR_PER_MAJOR: i64 = 100;

/// Monetary amount stored in santim (1/100 birr) to avoid
/// floating-point drift on balance arithmetic.
///
/// The gateway speaks decimal birr on the wire; [`Money::to_major`]
/// and [`Money::from_major`] convert at that boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units. Rejects negative amounts.
    pub fn new(minor: i64) -> Result<Self, DomainError> {
        if minor < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self(minor))
    }

    /// Wraps a signed minor-unit amount without the non-negative
    /// check. Stored balances can legitimately go negative (a
    /// provider-adjusted debit above the requested amount), so reads
    /// must not fail on them; sufficiency is enforced at withdrawal.
    pub fn from_signed(minor: i64) -> Self {
        Self(minor)
    }

    /// Zero birr.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Amount in minor units (santim).
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Amount in decimal birr, for the gateway wire format.
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Parses a decimal-birr wire amount (JSON number or numeric string).
    pub fn from_major(major: f64) -> Result<Self, DomainError> {
        if !major.is_finite() {
            return Err(DomainError::Validation("non-finite amount".into()));
        }
        let minor = (major * MINOR_PER_MAJOR as f64).round() as i64;
        Self::new(minor)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Subtraction that fails when the balance cannot cover the amount.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.0 < other.0 {
            return Err(DomainError::InsufficientFunds {
                available: self.0,
                requested: other.0,
            });
        }
        Ok(Money(self.0 - other.0))
    }

    /// Amount remaining after a percentage commission is deducted,
    /// rounded to the nearest santim.
    pub fn net_of_commission(&self, rate_percent: f64) -> Money {
        let net = self.0 as f64 * (1.0 - rate_percent / 100.0);
        Money((net.round() as i64).max(0))
    }

    /// The commission portion itself, `self - net_of_commission`.
    pub fn commission_at(&self, rate_percent: f64) -> Money {
        Money(self.0 - self.net_of_commission(rate_percent).0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, CURRENCY_CODE)
    }
}
