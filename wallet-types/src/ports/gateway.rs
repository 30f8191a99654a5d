//! Outbound payment gateway port.

use crate::domain::{Money, Msisdn};
use crate::error::GatewayError;

/// One outbound charge or payout instruction.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    /// Our correlation id, echoed back in webhooks.
    pub ref_id: String,
    pub amount: Money,
    pub reason: String,
    pub phone: Msisdn,
    /// Canonical payment method label.
    pub method: String,
}

/// The gateway's synchronous answer to an initiation call.
#[derive(Debug, Clone)]
pub struct GatewayAck {
    /// Gateway-assigned transaction id, when the response carried one
    /// in any of its known spellings.
    pub txn_id: Option<String>,
    /// Full response body for the audit trail.
    pub raw: serde_json::Value,
}

/// Synchronous, timeout-bounded calls to the payment gateway.
///
/// A failure here must never be auto-retried: the gateway may have
/// accepted the order before the failure was observed. Recovery goes
/// through [`PaymentGateway::check_transaction_status`] and operator
/// action.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Credit-direction charge (wallet topup, subscription payment).
    async fn direct_payment(&self, order: &GatewayOrder) -> Result<GatewayAck, GatewayError>;

    /// Debit-direction transfer (driver withdrawal).
    async fn payout_transfer(&self, order: &GatewayOrder) -> Result<GatewayAck, GatewayError>;

    /// On-demand status lookup for manual reconciliation.
    async fn check_transaction_status(&self, ref_id: &str)
    -> Result<serde_json::Value, GatewayError>;
}
