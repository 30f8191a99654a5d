//! Transaction domain model: one attempted money movement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use super::msisdn::Msisdn;
use super::wallet::{Role, UserId, WalletId};

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Direction of the movement relative to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money into the wallet (topup).
    Credit,
    /// Money out of the wallet (driver payout).
    Debit,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Credit => write!(f, "credit"),
            Direction::Debit => write!(f, "debit"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Lifecycle status. Transitions only `pending -> success` and
/// `pending -> failed`, exactly once; terminal states never re-enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A recorded money-movement attempt against the gateway.
///
/// `ref_id` is generated locally, handed to the gateway as the
/// correlation id at initiation, and immutable afterwards. `txn_id`
/// is the gateway's own id, learned from the initiation response or
/// from a webhook. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub ref_id: String,
    pub txn_id: Option<String>,
    pub user_id: UserId,
    pub role: Role,
    pub direction: Direction,
    pub amount: Money,
    pub commission: Option<Money>,
    pub total_amount: Option<Money>,
    pub method: Option<String>,
    pub status: TransactionStatus,
    pub msisdn: Option<Msisdn>,
    pub currency: String,
    pub wallet_id: Option<WalletId>,
    /// Opaque audit payload: initiation reason, gateway response,
    /// every webhook delivery.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a pending transaction with a fresh `ref_id`.
    pub fn initiate(
        user_id: UserId,
        role: Role,
        direction: Direction,
        amount: Money,
        method: String,
        msisdn: Msisdn,
        reason: &str,
    ) -> Self {
        let id = TransactionId::new();
        let now = Utc::now();
        Self {
            id,
            ref_id: id.to_string(),
            txn_id: None,
            user_id,
            role,
            direction,
            amount,
            commission: None,
            total_amount: None,
            method: Some(method),
            status: TransactionStatus::Pending,
            msisdn: Some(msisdn),
            currency: super::money::CURRENCY_CODE.to_string(),
            wallet_id: None,
            metadata: serde_json::json!({ "reason": reason }),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::msisdn::normalize_msisdn;

    #[test]
    fn test_initiate_is_pending_with_ref_id() {
        let tx = Transaction::initiate(
            UserId::new("u-1"),
            Role::Passenger,
            Direction::Credit,
            Money::new(10_000).unwrap(),
            "Telebirr".into(),
            normalize_msisdn("0912345678").unwrap(),
            "Wallet Topup",
        );
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.ref_id, tx.id.to_string());
        assert!(tx.txn_id.is_none());
        assert_eq!(tx.metadata["reason"], "Wallet Topup");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
    }
}
