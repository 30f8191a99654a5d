//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Role, TransactionId, TransactionStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Wallet operation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to top up a wallet through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupRequest {
    pub user_id: String,
    pub role: Role,
    /// Amount in santim (smallest currency unit).
    pub amount: i64,
    pub payment_method: String,
    /// Raw phone number; normalized before it reaches the gateway.
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Request to withdraw driver earnings through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: String,
    pub role: Role,
    /// Amount in santim (smallest currency unit).
    pub amount: i64,
    pub payment_method: String,
    /// Receiving account; a phone number for mobile-money rails.
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Accepted-for-processing response. The outcome arrives by webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateResponse {
    pub transaction_id: TransactionId,
    pub ref_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_txn_id: Option<String>,
    pub status: TransactionStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription bridge DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to pay for a subscription through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayRequest {
    /// Amount in santim (smallest currency unit).
    pub amount: i64,
    pub payment_method: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayResponse {
    pub subscription_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_txn_id: Option<String>,
    pub payment_status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook acknowledgment
// ─────────────────────────────────────────────────────────────────────────────

/// Always answered with a 200-class status, even for unmatched or
/// internally-failed notifications — the sender can only retry, and a
/// retry cannot fix a local defect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msisdn: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
            third_party_id: None,
            txn_id: None,
            ref_id: None,
            status: None,
            msisdn: None,
            updated_at: Utc::now(),
        }
    }

    pub fn not_ok(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            ..Self::ok()
        }
    }
}
