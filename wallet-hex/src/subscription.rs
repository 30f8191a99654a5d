//! Subscription payment bridge.
//!
//! One-off subscription payments go through the same gateway and the
//! same webhook endpoint as wallet topups, but the ledger is the
//! subscription's own payment fields. The subscription id is handed
//! to the gateway verbatim as the correlation id.

use serde_json::json;

use wallet_types::{
    AppError, GatewayNotification, GatewayOrder, LedgerRepository, Money, PaymentGateway,
    PaymentStatus, SubscriptionId, SubscriptionPayRequest, SubscriptionPayResponse,
    SubscriptionPayment, TransactionStatus, WebhookAck,
};

use crate::LedgerService;

impl<R: LedgerRepository, G: PaymentGateway> LedgerService<R, G> {
    /// Initiates a gateway charge for a subscription.
    pub async fn pay_subscription(
        &self,
        id: SubscriptionId,
        req: SubscriptionPayRequest,
    ) -> Result<SubscriptionPayResponse, AppError> {
        if req.amount <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        let amount = Money::new(req.amount)?;
        let (msisdn, method) = Self::normalize_order(&req.phone_number, &req.payment_method)?;
        let reason = req
            .reason
            .unwrap_or_else(|| "Subscription Payment".to_string());

        let payment = SubscriptionPayment::initiate(id.clone(), amount);
        self.repo.upsert_subscription_payment(&payment).await?;

        let order = GatewayOrder {
            ref_id: id.to_string(),
            amount,
            reason,
            phone: msisdn,
            method,
        };

        match self.gateway.direct_payment(&order).await {
            Ok(ack) => {
                if let Some(txn) = ack.txn_id.as_deref() {
                    self.repo.record_subscription_gateway_ref(&id, txn).await?;
                }
                Ok(SubscriptionPayResponse {
                    subscription_id: id.to_string(),
                    gateway_txn_id: ack.txn_id,
                    payment_status: PaymentStatus::Pending.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(subscription_id = %id, error = %e, "gateway rejected subscription charge");
                self.repo
                    .settle_subscription_payment(
                        &id,
                        PaymentStatus::Failed,
                        &json!({ "gateway_error": e.to_string() }),
                    )
                    .await?;
                Err(e.into())
            }
        }
    }

    /// Bridge leg of webhook reconciliation: flips the payment fields
    /// at most once; PAID also activates the subscription.
    pub(crate) async fn settle_subscription(
        &self,
        payment: SubscriptionPayment,
        note: &GatewayNotification,
    ) -> Result<WebhookAck, AppError> {
        let mut ack = WebhookAck::ok();
        ack.third_party_id = Some(payment.subscription_id.to_string());
        ack.txn_id = note.txn_id.clone();
        ack.status = note.raw_status.clone();
        ack.msisdn = note.msisdn.clone();

        let status = match note.status {
            TransactionStatus::Success => PaymentStatus::Paid,
            TransactionStatus::Failed => PaymentStatus::Failed,
            // Progress ping; the bridge has no metadata trail worth a write.
            TransactionStatus::Pending => return Ok(ack),
        };

        let outcome = self
            .repo
            .settle_subscription_payment(&payment.subscription_id, status, &note.raw)
            .await?;

        tracing::info!(
            subscription_id = %payment.subscription_id,
            status = %status,
            ?outcome,
            "subscription payment settled"
        );

        Ok(ack)
    }
}
