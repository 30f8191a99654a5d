//! Webhook reconciliation.
//!
//! The webhook is the single authority for money movement: no balance
//! changes at initiation, all of them here. A delivery is matched by
//! our correlation id first, the gateway's id second, the
//! subscription bridge third. Everything downstream of a successful
//! match is acknowledged `{ok:true}`; an unmatched or internally
//! failed delivery is acknowledged `{ok:false}` with HTTP 200, since
//! a gateway retry cannot fix a local defect.

use serde_json::{Value, json};

use wallet_types::{
    AppError, Direction, GatewayNotification, LedgerRepository, PaymentGateway, Role,
    SettleOutcome, SettleRequest, Transaction, TransactionStatus, WebhookAck,
};

use crate::LedgerService;

/// Appends the delivered payload to a transaction's audit metadata.
fn merge_webhook(existing: &Value, delivery: &Value) -> Value {
    let mut merged = if existing.is_object() {
        existing.clone()
    } else {
        json!({})
    };
    merged["webhook"] = delivery.clone();
    merged
}

impl<R: LedgerRepository, G: PaymentGateway> LedgerService<R, G> {
    /// Entry point for `POST /api/wallet/webhook`.
    ///
    /// Errors only for a structurally invalid payload (no id in any
    /// recognized spelling) — that is the caller's defect and gets a
    /// 400. Every other failure mode is downgraded to `{ok:false}`.
    pub async fn apply_webhook(&self, body: &Value) -> Result<WebhookAck, AppError> {
        let Some(note) = GatewayNotification::from_value(body) else {
            return Err(AppError::BadRequest(
                "Webhook payload carries no recognizable transaction id".into(),
            ));
        };

        match self.reconcile(&note).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                tracing::error!(
                    correlation_id = ?note.correlation_id,
                    txn_id = ?note.txn_id,
                    error = %e,
                    "webhook reconciliation failed"
                );
                Ok(WebhookAck::not_ok("Reconciliation failed"))
            }
        }
    }

    async fn reconcile(&self, note: &GatewayNotification) -> Result<WebhookAck, AppError> {
        if let Some(id) = note.correlation_id.as_deref() {
            if let Some(tx) = self.repo.find_transaction_by_ref(id).await? {
                return self.settle_wallet_transaction(tx, note).await;
            }
        }

        if let Some(id) = note.txn_id.as_deref() {
            if let Some(tx) = self.repo.find_transaction_by_txn(id).await? {
                return self.settle_wallet_transaction(tx, note).await;
            }
        }

        if let Some(payment) = self
            .repo
            .find_subscription_payment(note.correlation_id.as_deref(), note.txn_id.as_deref())
            .await?
        {
            return self.settle_subscription(payment, note).await;
        }

        tracing::warn!(
            correlation_id = ?note.correlation_id,
            txn_id = ?note.txn_id,
            "webhook matched no transaction"
        );
        let mut ack = WebhookAck::not_ok("No matching transaction");
        ack.third_party_id = note.correlation_id.clone();
        ack.txn_id = note.txn_id.clone();
        Ok(ack)
    }

    async fn settle_wallet_transaction(
        &self,
        tx: Transaction,
        note: &GatewayNotification,
    ) -> Result<WebhookAck, AppError> {
        let mut ack = WebhookAck::ok();
        ack.third_party_id = Some(tx.ref_id.clone());
        ack.txn_id = note.txn_id.clone().or_else(|| tx.txn_id.clone());
        ack.ref_id = note.provider_ref.clone();
        ack.status = note.raw_status.clone();
        ack.msisdn = note.msisdn.clone();

        if !note.status.is_terminal() {
            // Progress ping. Keep the audit trail current, nothing else.
            let metadata = merge_webhook(&tx.metadata, &note.raw);
            self.repo
                .record_gateway_ack(tx.id, note.txn_id.as_deref(), &metadata)
                .await?;
            return Ok(ack);
        }

        // The provider's confirmed (possibly adjusted) amount wins
        // over what we requested.
        let confirmed = note.amount.unwrap_or(tx.amount);

        let (delta, commission) = match (note.status, tx.direction) {
            (TransactionStatus::Success, Direction::Credit) if tx.role == Role::Driver => {
                let net = confirmed.net_of_commission(self.commission_rate);
                (
                    net.minor(),
                    Some(confirmed.commission_at(self.commission_rate).minor()),
                )
            }
            (TransactionStatus::Success, Direction::Credit) => {
                (confirmed.minor(), note.commission.map(|m| m.minor()))
            }
            (TransactionStatus::Success, Direction::Debit) => {
                (-confirmed.minor(), note.commission.map(|m| m.minor()))
            }
            // A failed outcome settles the status, never the balance.
            _ => (0, note.commission.map(|m| m.minor())),
        };

        let outcome = self
            .repo
            .settle_transaction(SettleRequest {
                transaction_id: tx.id,
                status: note.status,
                balance_delta: delta,
                txn_id: note.txn_id.clone(),
                msisdn: note.msisdn.clone(),
                commission,
                metadata: merge_webhook(&tx.metadata, &note.raw),
            })
            .await?;

        match outcome {
            SettleOutcome::Applied => {
                tracing::info!(
                    ref_id = %tx.ref_id,
                    status = %note.status,
                    delta,
                    "transaction settled"
                );
            }
            SettleOutcome::AlreadyFinal => {
                tracing::info!(ref_id = %tx.ref_id, "duplicate delivery; balance untouched");
            }
        }

        Ok(ack)
    }
}
