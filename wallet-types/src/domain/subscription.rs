//! Subscription payment bridge ledger.
//!
//! One-off subscription payments reuse the gateway signing/matching
//! pattern, but the ledger is the subscription's own payment fields
//! instead of a wallet. No commission math applies here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Subscription identifier, used verbatim as the gateway correlation
/// id at initiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Pending => write!(f, "PENDING"),
            SubscriptionStatus::Active => write!(f, "ACTIVE"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SubscriptionStatus::Pending),
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            other => Err(format!("unknown subscription status: {other}")),
        }
    }
}

/// Payment-tracking fields of one subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    pub subscription_id: SubscriptionId,
    /// Gateway-assigned reference, the secondary match key.
    pub gateway_ref: Option<String>,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub subscription_status: SubscriptionStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPayment {
    pub fn initiate(subscription_id: SubscriptionId, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            subscription_id,
            gateway_ref: None,
            amount,
            payment_status: PaymentStatus::Pending,
            subscription_status: SubscriptionStatus::Pending,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}
