//! Wallet Application Service
//!
//! Orchestrates initiation flows through the repository and gateway
//! ports. Contains NO infrastructure logic - pure business
//! orchestration. Balance movement is never done here; it belongs to
//! webhook reconciliation.

use wallet_types::{
    AppError, Direction, GatewayOrder, InitiateResponse, LedgerRepository, Money, Msisdn,
    PaymentGateway, Role, TopupRequest, Transaction, TransactionStatus, UserId, Wallet,
    WithdrawRequest, normalize_method, normalize_msisdn,
};

/// Application service for wallet operations.
///
/// Generic over `R: LedgerRepository` and `G: PaymentGateway` - both
/// adapters are injected at compile time. This enables:
/// - Swapping adapters without code changes
/// - Testing with in-memory mocks
/// - Compile-time checks for port implementation
pub struct LedgerService<R: LedgerRepository, G: PaymentGateway> {
    pub(crate) repo: R,
    pub(crate) gateway: G,
    pub(crate) commission_rate: f64,
}

impl<R: LedgerRepository, G: PaymentGateway> LedgerService<R, G> {
    /// Creates a new service. `commission_rate_percent` applies to
    /// driver-role credits only.
    pub fn new(repo: R, gateway: G, commission_rate_percent: f64) -> Self {
        Self {
            repo,
            gateway,
            commission_rate: commission_rate_percent,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    fn positive_amount(minor: i64) -> Result<Money, AppError> {
        if minor <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        Money::new(minor).map_err(Into::into)
    }

    pub(crate) fn normalize_order(phone: &str, method: &str) -> Result<(Msisdn, String), AppError> {
        let msisdn = normalize_msisdn(phone)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid phone number: {phone}")))?;
        if method.trim().is_empty() {
            return Err(AppError::BadRequest("Payment method is required".into()));
        }
        Ok((msisdn, normalize_method(method)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Initiation
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a wallet topup. The transaction is persisted as pending
    /// before the gateway call; the balance only moves when the
    /// webhook confirms the outcome.
    pub async fn topup(&self, req: TopupRequest) -> Result<InitiateResponse, AppError> {
        let amount = Self::positive_amount(req.amount)?;
        let (msisdn, method) = Self::normalize_order(&req.phone_number, &req.payment_method)?;
        let user = UserId::new(req.user_id);
        let reason = req.reason.unwrap_or_else(|| "Wallet Topup".to_string());

        let wallet = self.repo.find_or_create_wallet(&user, req.role).await?;
        if !wallet.is_active {
            return Err(AppError::BadRequest("Wallet is deactivated".into()));
        }

        let tx = Transaction::initiate(
            user,
            req.role,
            Direction::Credit,
            amount,
            method.clone(),
            msisdn.clone(),
            &reason,
        );
        self.repo.create_transaction(&tx).await?;

        let order = GatewayOrder {
            ref_id: tx.ref_id.clone(),
            amount,
            reason,
            phone: msisdn,
            method,
        };

        let ack = self.gateway.direct_payment(&order).await;
        self.finish_initiation(tx, &order, ack).await
    }

    /// Starts a driver withdrawal. Balance sufficiency is checked
    /// before anything mutates or the gateway is contacted; the actual
    /// decrement happens only on the confirmed-success webhook.
    pub async fn withdraw(&self, req: WithdrawRequest) -> Result<InitiateResponse, AppError> {
        let amount = Self::positive_amount(req.amount)?;
        let (msisdn, method) = Self::normalize_order(&req.destination, &req.payment_method)?;
        let user = UserId::new(req.user_id);
        let reason = req.reason.unwrap_or_else(|| "Wallet Withdrawal".to_string());

        let wallet = self
            .repo
            .get_wallet(&user, req.role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet for user {user}")))?;
        if !wallet.is_active {
            return Err(AppError::BadRequest("Wallet is deactivated".into()));
        }
        wallet.balance.checked_sub(amount)?;

        let tx = Transaction::initiate(
            user,
            req.role,
            Direction::Debit,
            amount,
            method.clone(),
            msisdn.clone(),
            &reason,
        );
        self.repo.create_transaction(&tx).await?;

        let order = GatewayOrder {
            ref_id: tx.ref_id.clone(),
            amount,
            reason,
            phone: msisdn,
            method,
        };

        let ack = self.gateway.payout_transfer(&order).await;
        self.finish_initiation(tx, &order, ack).await
    }

    /// Shared tail of both initiation flows: persist the gateway's
    /// synchronous answer, or mark the transaction failed and surface
    /// the error.
    async fn finish_initiation(
        &self,
        tx: Transaction,
        order: &GatewayOrder,
        ack: Result<wallet_types::GatewayAck, wallet_types::GatewayError>,
    ) -> Result<InitiateResponse, AppError> {
        match ack {
            Ok(ack) => {
                let metadata = serde_json::json!({
                    "reason": order.reason,
                    "gateway_response": ack.raw,
                });
                self.repo
                    .record_gateway_ack(tx.id, ack.txn_id.as_deref(), &metadata)
                    .await?;

                Ok(InitiateResponse {
                    transaction_id: tx.id,
                    ref_id: tx.ref_id,
                    gateway_txn_id: ack.txn_id,
                    status: TransactionStatus::Pending,
                })
            }
            Err(e) => {
                tracing::warn!(ref_id = %tx.ref_id, error = %e, "gateway rejected initiation");
                let metadata = serde_json::json!({
                    "reason": order.reason,
                    "gateway_error": e.to_string(),
                });
                self.repo.mark_transaction_failed(tx.id, &metadata).await?;
                Err(e.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads and manual recovery
    // ─────────────────────────────────────────────────────────────────────────

    /// Wallet read for a (user, role) pair.
    pub async fn wallet(&self, user_id: &UserId, role: Role) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet(user_id, role)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.ok_or_else(|| AppError::NotFound(format!("Wallet for user {user_id}")))
            })
    }

    /// Soft-deletes a wallet.
    pub async fn deactivate_wallet(&self, user_id: &UserId, role: Role) -> Result<(), AppError> {
        let deactivated = self.repo.deactivate_wallet(user_id, role).await?;
        if !deactivated {
            return Err(AppError::NotFound(format!("Wallet for user {user_id}")));
        }
        Ok(())
    }

    /// Lists every transaction of a user, newest first.
    pub async fn transactions(&self, user_id: &UserId) -> Result<Vec<Transaction>, AppError> {
        self.repo
            .list_transactions_for_user(user_id)
            .await
            .map_err(Into::into)
    }

    /// On-demand gateway status lookup for a stuck transaction. Pure
    /// passthrough: the authoritative state change still arrives by
    /// webhook.
    pub async fn check_status(&self, ref_id: &str) -> Result<serde_json::Value, AppError> {
        let _ = self
            .repo
            .find_transaction_by_ref(ref_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {ref_id}")))?;

        self.gateway
            .check_transaction_status(ref_id)
            .await
            .map_err(Into::into)
    }
}
