//! Database row structs and their conversion into domain types.
//!
//! SQLite stores ids and timestamps as TEXT and booleans as INTEGER;
//! every conversion back into the domain goes through `into_domain`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use wallet_types::{
    Direction, Money, PaymentStatus, RepoError, Role, SubscriptionId, SubscriptionPayment,
    SubscriptionStatus, Transaction, TransactionId, TransactionStatus, UserId, Wallet, WalletId,
    normalize_msisdn,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Wallet row from database.
#[derive(FromRow)]
pub struct DbWallet {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub balance: i64,
    pub currency: String,
    pub is_active: i64,
    pub last_transaction_at: Option<String>,
    pub created_at: String,
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub ref_id: String,
    pub txn_id: Option<String>,
    pub user_id: String,
    pub role: String,
    pub direction: String,
    pub amount: i64,
    pub commission: Option<i64>,
    pub total_amount: Option<i64>,
    pub method: Option<String>,
    pub status: String,
    pub msisdn: Option<String>,
    pub currency: String,
    pub wallet_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Subscription payment row from database.
#[derive(FromRow)]
pub struct DbSubscriptionPayment {
    pub subscription_id: String,
    pub gateway_ref: Option<String>,
    pub amount: i64,
    pub payment_status: String,
    pub subscription_status: String,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Owner columns of a transaction, for the settle path.
#[derive(FromRow)]
pub struct DbTransactionOwner {
    pub user_id: String,
    pub role: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_metadata(s: Option<String>) -> serde_json::Value {
    s.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::Value::Null)
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbWallet {
    /// Convert database row to domain Wallet.
    pub fn into_domain(self) -> Result<Wallet, RepoError> {
        let uuid =
            uuid::Uuid::parse_str(&self.id).map_err(|e| RepoError::Database(e.to_string()))?;
        let role = Role::from_str(&self.role).map_err(RepoError::Database)?;
        // Signed read: an overdrawn balance must stay readable.
        let balance = Money::from_signed(self.balance);

        let last_transaction_at = self
            .last_transaction_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(Wallet {
            id: WalletId::from_uuid(uuid),
            user_id: UserId::new(self.user_id),
            role,
            balance,
            currency: self.currency,
            is_active: self.is_active != 0,
            last_transaction_at,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let uuid =
            uuid::Uuid::parse_str(&self.id).map_err(|e| RepoError::Database(e.to_string()))?;
        let role = Role::from_str(&self.role).map_err(RepoError::Database)?;
        let direction = Direction::from_str(&self.direction).map_err(RepoError::Database)?;
        let status = TransactionStatus::from_str(&self.status).map_err(RepoError::Database)?;

        let amount = Money::new(self.amount).map_err(RepoError::Domain)?;
        let commission = self
            .commission
            .map(Money::new)
            .transpose()
            .map_err(RepoError::Domain)?;
        let total_amount = self
            .total_amount
            .map(Money::new)
            .transpose()
            .map_err(RepoError::Domain)?;

        let wallet_id = self
            .wallet_id
            .map(|s| uuid::Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| RepoError::Database(e.to_string()))?
            .map(WalletId::from_uuid);

        Ok(Transaction {
            id: TransactionId::from_uuid(uuid),
            ref_id: self.ref_id,
            txn_id: self.txn_id,
            user_id: UserId::new(self.user_id),
            role,
            direction,
            amount,
            commission,
            total_amount,
            method: self.method,
            status,
            // Stored values are already canonical, so this only drops
            // rows written before normalization existed.
            msisdn: self.msisdn.as_deref().and_then(normalize_msisdn),
            currency: self.currency,
            wallet_id,
            metadata: parse_metadata(self.metadata),
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl DbSubscriptionPayment {
    /// Convert database row to domain SubscriptionPayment.
    pub fn into_domain(self) -> Result<SubscriptionPayment, RepoError> {
        let payment_status =
            PaymentStatus::from_str(&self.payment_status).map_err(RepoError::Database)?;
        let subscription_status =
            SubscriptionStatus::from_str(&self.subscription_status).map_err(RepoError::Database)?;
        let amount = Money::new(self.amount).map_err(RepoError::Domain)?;

        Ok(SubscriptionPayment {
            subscription_id: SubscriptionId::new(self.subscription_id),
            gateway_ref: self.gateway_ref,
            amount,
            payment_status,
            subscription_status,
            metadata: parse_metadata(self.metadata),
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}
