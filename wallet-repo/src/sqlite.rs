//! SQLite ledger adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use wallet_types::{
    LedgerRepository, PaymentStatus, RepoError, Role, SettleOutcome, SettleRequest,
    SubscriptionId, SubscriptionPayment, Transaction, TransactionId, UserId, Wallet,
};

use crate::types::{DbSubscriptionPayment, DbTransaction, DbTransactionOwner, DbWallet};

const TRANSACTION_COLUMNS: &str = "id, ref_id, txn_id, user_id, role, direction, amount, \
     commission, total_amount, method, status, msisdn, currency, wallet_id, metadata, \
     created_at, updated_at";

const WALLET_COLUMNS: &str =
    "id, user_id, role, balance, currency, is_active, last_transaction_at, created_at";

const SUBSCRIPTION_COLUMNS: &str = "subscription_id, gateway_ref, amount, payment_status, \
     subscription_status, metadata, created_at, updated_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite ledger implementation.
pub struct SqliteLedgerRepo {
    pool: SqlitePool,
}

impl SqliteLedgerRepo {
    /// Creates a new SQLite ledger with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert_wallet(&self, wallet: &Wallet) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO wallets (id, user_id, role, balance, currency, is_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, 1, ?, ?)"#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.user_id.as_str())
        .bind(wallet.role.to_string())
        .bind(wallet.balance.minor())
        .bind(&wallet.currency)
        .bind(wallet.created_at.to_rfc3339())
        .bind(wallet.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn select_wallet(
        &self,
        user_id: &UserId,
        role: Role,
    ) -> Result<Option<DbWallet>, RepoError> {
        sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ? AND role = ?"
        ))
        .bind(user_id.as_str())
        .bind(role.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteLedgerRepo {
    async fn find_or_create_wallet(
        &self,
        user_id: &UserId,
        role: Role,
    ) -> Result<Wallet, RepoError> {
        if let Some(row) = self.select_wallet(user_id, role).await? {
            return row.into_domain();
        }

        let wallet = Wallet::new(user_id.clone(), role);
        match self.insert_wallet(&wallet).await {
            Ok(()) => Ok(wallet),
            // Lost a race to a concurrent creation; the winner's row is
            // the wallet.
            Err(e) if is_unique_violation(&e) => {
                let row = self
                    .select_wallet(user_id, role)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                row.into_domain()
            }
            Err(e) => Err(RepoError::Database(e.to_string())),
        }
    }

    async fn get_wallet(&self, user_id: &UserId, role: Role) -> Result<Option<Wallet>, RepoError> {
        let row = self.select_wallet(user_id, role).await?;
        row.map(DbWallet::into_domain).transpose()
    }

    async fn deactivate_wallet(&self, user_id: &UserId, role: Role) -> Result<bool, RepoError> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"UPDATE wallets SET is_active = 0, updated_at = ?
               WHERE user_id = ? AND role = ? AND is_active = 1"#,
        )
        .bind(&now)
        .bind(user_id.as_str())
        .bind(role.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_transaction(&self, tx: &Transaction) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO transactions
               (id, ref_id, txn_id, user_id, role, direction, amount, commission, total_amount,
                method, status, msisdn, currency, wallet_id, metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.id.to_string())
        .bind(&tx.ref_id)
        .bind(&tx.txn_id)
        .bind(tx.user_id.as_str())
        .bind(tx.role.to_string())
        .bind(tx.direction.to_string())
        .bind(tx.amount.minor())
        .bind(tx.commission.map(|m| m.minor()))
        .bind(tx.total_amount.map(|m| m.minor()))
        .bind(&tx.method)
        .bind(tx.status.to_string())
        .bind(tx.msisdn.as_ref().map(|m| m.as_str().to_string()))
        .bind(&tx.currency)
        .bind(tx.wallet_id.map(|w| w.to_string()))
        .bind(tx.metadata.to_string())
        .bind(tx.created_at.to_rfc3339())
        .bind(tx.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Conflict(format!("duplicate ref id: {}", tx.ref_id))
            } else {
                RepoError::Database(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn record_gateway_ack(
        &self,
        id: TransactionId,
        txn_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<(), RepoError> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"UPDATE transactions SET txn_id = COALESCE(?, txn_id), metadata = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(txn_id)
        .bind(metadata.to_string())
        .bind(&now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn mark_transaction_failed(
        &self,
        id: TransactionId,
        metadata: &serde_json::Value,
    ) -> Result<(), RepoError> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"UPDATE transactions SET status = 'failed', metadata = ?, updated_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(metadata.to_string())
        .bind(&now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_transaction_by_ref(
        &self,
        ref_id: &str,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE ref_id = ?"
        ))
        .bind(ref_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn find_transaction_by_txn(
        &self,
        txn_id: &str,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE txn_id = ? \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(txn_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ? \
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn settle_transaction(&self, req: SettleRequest) -> Result<SettleOutcome, RepoError> {
        let now = chrono::Utc::now().to_rfc3339();
        let id_str = req.transaction_id.to_string();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // The conditional flip. Guarding on status = 'pending' inside
        // the same database transaction as the balance move is what
        // makes duplicate deliveries harmless.
        let result = sqlx::query(
            r#"UPDATE transactions
               SET status = ?,
                   txn_id = COALESCE(?, txn_id),
                   msisdn = COALESCE(?, msisdn),
                   commission = COALESCE(?, commission),
                   metadata = ?,
                   updated_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(req.status.to_string())
        .bind(&req.txn_id)
        .bind(&req.msisdn)
        .bind(req.commission)
        .bind(req.metadata.to_string())
        .bind(&now)
        .bind(&id_str)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Already terminal. Record the delivery in metadata, leave
            // the balance alone.
            let refresh = sqlx::query(
                r#"UPDATE transactions SET metadata = ?, updated_at = ? WHERE id = ?"#,
            )
            .bind(req.metadata.to_string())
            .bind(&now)
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if refresh.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }

            db_tx
                .commit()
                .await
                .map_err(|e| RepoError::Transaction(e.to_string()))?;
            return Ok(SettleOutcome::AlreadyFinal);
        }

        if req.balance_delta != 0 {
            let owner: DbTransactionOwner =
                sqlx::query_as(r#"SELECT user_id, role FROM transactions WHERE id = ?"#)
                    .bind(&id_str)
                    .fetch_one(&mut *db_tx)
                    .await
                    .map_err(|e| RepoError::Database(e.to_string()))?;

            let updated = sqlx::query(
                r#"UPDATE wallets
                   SET balance = balance + ?, last_transaction_at = ?, updated_at = ?
                   WHERE user_id = ? AND role = ?"#,
            )
            .bind(req.balance_delta)
            .bind(&now)
            .bind(&now)
            .bind(&owner.user_id)
            .bind(&owner.role)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if updated.rows_affected() == 0 {
                // Webhook arrived before the wallet row ever existed.
                sqlx::query(
                    r#"INSERT INTO wallets
                       (id, user_id, role, balance, currency, is_active, last_transaction_at,
                        created_at, updated_at)
                       VALUES (?, ?, ?, ?, 'ETB', 1, ?, ?, ?)"#,
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(&owner.user_id)
                .bind(&owner.role)
                .bind(req.balance_delta)
                .bind(&now)
                .bind(&now)
                .bind(&now)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
            }

            sqlx::query(
                r#"UPDATE transactions
                   SET wallet_id = (SELECT id FROM wallets WHERE user_id = ? AND role = ?)
                   WHERE id = ?"#,
            )
            .bind(&owner.user_id)
            .bind(&owner.role)
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(SettleOutcome::Applied)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription payment bridge
    // ─────────────────────────────────────────────────────────────────────────

    async fn upsert_subscription_payment(
        &self,
        payment: &SubscriptionPayment,
    ) -> Result<(), RepoError> {
        // Re-initiating a still-pending payment refreshes it; a settled
        // payment is immutable.
        sqlx::query(
            r#"INSERT INTO subscription_payments
               (subscription_id, gateway_ref, amount, payment_status, subscription_status,
                metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(subscription_id) DO UPDATE SET
                   amount = excluded.amount,
                   metadata = excluded.metadata,
                   updated_at = excluded.updated_at
               WHERE subscription_payments.payment_status = 'PENDING'"#,
        )
        .bind(payment.subscription_id.as_str())
        .bind(&payment.gateway_ref)
        .bind(payment.amount.minor())
        .bind(payment.payment_status.to_string())
        .bind(payment.subscription_status.to_string())
        .bind(payment.metadata.to_string())
        .bind(payment.created_at.to_rfc3339())
        .bind(payment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn record_subscription_gateway_ref(
        &self,
        id: &SubscriptionId,
        gateway_ref: &str,
    ) -> Result<(), RepoError> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"UPDATE subscription_payments SET gateway_ref = ?, updated_at = ?
               WHERE subscription_id = ?"#,
        )
        .bind(gateway_ref)
        .bind(&now)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_subscription_payment(
        &self,
        correlation_id: Option<&str>,
        gateway_ref: Option<&str>,
    ) -> Result<Option<SubscriptionPayment>, RepoError> {
        if let Some(id) = correlation_id {
            let row: Option<DbSubscriptionPayment> = sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscription_payments \
                 WHERE subscription_id = ?"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if let Some(row) = row {
                return row.into_domain().map(Some);
            }
        }

        if let Some(gw_ref) = gateway_ref {
            let row: Option<DbSubscriptionPayment> = sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscription_payments \
                 WHERE gateway_ref = ?"
            ))
            .bind(gw_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if let Some(row) = row {
                return row.into_domain().map(Some);
            }
        }

        Ok(None)
    }

    async fn settle_subscription_payment(
        &self,
        id: &SubscriptionId,
        status: PaymentStatus,
        metadata: &serde_json::Value,
    ) -> Result<SettleOutcome, RepoError> {
        let now = chrono::Utc::now().to_rfc3339();
        let status_str = status.to_string();

        let result = sqlx::query(
            r#"UPDATE subscription_payments
               SET payment_status = ?,
                   subscription_status = CASE WHEN ? = 'PAID' THEN 'ACTIVE'
                                              ELSE subscription_status END,
                   metadata = ?,
                   updated_at = ?
               WHERE subscription_id = ? AND payment_status = 'PENDING'"#,
        )
        .bind(&status_str)
        .bind(&status_str)
        .bind(metadata.to_string())
        .bind(&now)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() > 0 {
            return Ok(SettleOutcome::Applied);
        }

        let refresh = sqlx::query(
            r#"UPDATE subscription_payments SET metadata = ?, updated_at = ?
               WHERE subscription_id = ?"#,
        )
        .bind(metadata.to_string())
        .bind(&now)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if refresh.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(SettleOutcome::AlreadyFinal)
    }
}
