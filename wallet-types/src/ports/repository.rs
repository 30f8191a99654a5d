//! Ledger repository port.
//!
//! Adapters (SQLite in production, an in-memory mock in tests)
//! implement this trait. Balance mutation happens ONLY inside
//! [`LedgerRepository::settle_transaction`], which must be an atomic
//! conditional read-modify-write: the status flips out of `pending`
//! in the same database transaction that moves the balance, so two
//! concurrent deliveries of the same notification cannot both apply.

use crate::domain::{
    PaymentStatus, Role, SubscriptionId, SubscriptionPayment, Transaction, TransactionId,
    TransactionStatus, UserId, Wallet,
};
use crate::error::RepoError;

/// Everything a settle needs, computed up front by the reconciler.
#[derive(Debug, Clone)]
pub struct SettleRequest {
    pub transaction_id: TransactionId,
    /// Terminal status to transition into.
    pub status: TransactionStatus,
    /// Signed wallet delta in santim. Positive credits, negative
    /// debits, zero for a failed outcome.
    pub balance_delta: i64,
    /// Gateway id learned from the notification, if any.
    pub txn_id: Option<String>,
    pub msisdn: Option<String>,
    pub commission: Option<i64>,
    /// Replacement metadata (already merged with the webhook payload).
    pub metadata: serde_json::Value,
}

/// Outcome of a conditional settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// First transition into a terminal state; the balance moved.
    Applied,
    /// The transaction was already terminal. Metadata was refreshed,
    /// the balance was not touched.
    AlreadyFinal,
}

#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Wallets
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the (user, role) wallet, creating it with a zero
    /// balance when absent.
    async fn find_or_create_wallet(&self, user_id: &UserId, role: Role)
    -> Result<Wallet, RepoError>;

    async fn get_wallet(&self, user_id: &UserId, role: Role) -> Result<Option<Wallet>, RepoError>;

    /// Soft-delete. Wallets are never removed.
    async fn deactivate_wallet(&self, user_id: &UserId, role: Role) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a freshly initiated pending transaction. Fails with
    /// [`RepoError::Conflict`] on a duplicate ref id.
    async fn create_transaction(&self, tx: &Transaction) -> Result<(), RepoError>;

    /// Records the gateway's synchronous response: its txn id (when
    /// present) and the response payload in metadata.
    async fn record_gateway_ack(
        &self,
        id: TransactionId,
        txn_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<(), RepoError>;

    /// Transitions a pending transaction straight to `failed` after a
    /// gateway initiation error. No balance is involved.
    async fn mark_transaction_failed(
        &self,
        id: TransactionId,
        metadata: &serde_json::Value,
    ) -> Result<(), RepoError>;

    async fn find_transaction_by_ref(&self, ref_id: &str)
    -> Result<Option<Transaction>, RepoError>;

    async fn find_transaction_by_txn(&self, txn_id: &str)
    -> Result<Option<Transaction>, RepoError>;

    async fn list_transactions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Transaction>, RepoError>;

    /// THE idempotency primitive. In one atomic operation: set the
    /// terminal status only if the row is still `pending`, and apply
    /// the balance delta to the owning wallet (lazily created). When
    /// the row is already terminal, only metadata is refreshed.
    async fn settle_transaction(&self, req: SettleRequest) -> Result<SettleOutcome, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription payment bridge
    // ─────────────────────────────────────────────────────────────────────────

    async fn upsert_subscription_payment(
        &self,
        payment: &SubscriptionPayment,
    ) -> Result<(), RepoError>;

    async fn record_subscription_gateway_ref(
        &self,
        id: &SubscriptionId,
        gateway_ref: &str,
    ) -> Result<(), RepoError>;

    /// Match by subscription id first, then by the stored gateway
    /// reference.
    async fn find_subscription_payment(
        &self,
        correlation_id: Option<&str>,
        gateway_ref: Option<&str>,
    ) -> Result<Option<SubscriptionPayment>, RepoError>;

    /// Conditional settle for the bridge: payment status flips out of
    /// `PENDING` at most once; PAID also activates the subscription.
    async fn settle_subscription_payment(
        &self,
        id: &SubscriptionId,
        status: PaymentStatus,
        metadata: &serde_json::Value,
    ) -> Result<SettleOutcome, RepoError>;
}
