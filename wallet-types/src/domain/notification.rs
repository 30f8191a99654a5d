//! Canonical gateway notification record.
//!
//! The gateway's webhook payloads are not stable: fields arrive flat
//! or nested under a `data` envelope, in capitalized or lower-camel
//! spellings, with amounts as numbers or numeric strings. All of that
//! shape-sniffing lives here; business logic only ever sees the
//! canonical [`GatewayNotification`].

use serde::Serialize;
use serde_json::Value;

use super::money::Money;
use super::msisdn::normalize_msisdn;
use super::transaction::TransactionStatus;

/// Provider status vocabulary collapsed to the internal lifecycle.
/// Anything not in the two fixed lists stays pending.
pub fn classify_status(raw: &str) -> TransactionStatus {
    match raw.to_uppercase().as_str() {
        "COMPLETED" | "SUCCESS" | "APPROVED" => TransactionStatus::Success,
        "FAILED" | "CANCELLED" | "DECLINED" => TransactionStatus::Failed,
        _ => TransactionStatus::Pending,
    }
}

/// One asynchronous gateway notification, normalized.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayNotification {
    /// Echo of the correlation id we handed out at initiation.
    pub correlation_id: Option<String>,
    /// Gateway-assigned transaction id.
    pub txn_id: Option<String>,
    /// Provider-side reference. Informational only, never a match key.
    pub provider_ref: Option<String>,
    pub raw_status: Option<String>,
    pub status: TransactionStatus,
    /// Provider-confirmed (possibly adjusted) amount.
    pub amount: Option<Money>,
    pub commission: Option<Money>,
    /// Canonical `+2519...` form; a non-normalizable value is dropped
    /// rather than stored over a known-good number.
    pub msisdn: Option<String>,
    /// Full payload as delivered, kept for the audit trail.
    pub raw: Value,
}

impl GatewayNotification {
    /// Normalizes a webhook body. Returns `None` only when the payload
    /// is structurally invalid: neither a correlation id nor a gateway
    /// id is present in any recognized spelling.
    pub fn from_value(body: &Value) -> Option<Self> {
        // Payloads may wrap everything in a `data` envelope.
        let data = match body.get("data") {
            Some(d) if d.is_object() => d,
            _ => body,
        };

        let correlation_id = first_string(
            data,
            &["thirdPartyId", "ID", "id", "transactionId", "clientReference"],
        );
        let txn_id = first_string(data, &["TxnId", "txnId"]);

        if correlation_id.is_none() && txn_id.is_none() {
            return None;
        }

        let raw_status = first_string(data, &["Status", "status"]);
        let status = raw_status
            .as_deref()
            .map(classify_status)
            .unwrap_or(TransactionStatus::Pending);

        Some(Self {
            correlation_id,
            txn_id,
            provider_ref: first_string(data, &["RefId", "refId"]),
            raw_status,
            status,
            amount: first_amount(data, &["adjustedAmount", "amount", "Amount", "TotalAmount"]),
            commission: first_amount(data, &["commission", "Commission"]),
            msisdn: first_string(data, &["Msisdn", "msisdn"])
                .as_deref()
                .and_then(normalize_msisdn)
                .map(|m| m.into_string()),
            raw: body.clone(),
        })
    }
}

/// First present field, stringified. Gateways have been observed to
/// send ids as JSON numbers.
fn first_string(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match data.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// First present field parsed as a decimal-birr amount.
fn first_amount(data: &Value, keys: &[&str]) -> Option<Money> {
    keys.iter().find_map(|k| match data.get(*k) {
        Some(Value::Number(n)) => n.as_f64().and_then(|f| Money::from_major(f).ok()),
        Some(Value::String(s)) => s.parse::<f64>().ok().and_then(|f| Money::from_major(f).ok()),
        _ => None,
    })
}
