//! HTTP client for the payment gateway.

use serde_json::{Value, json};
use std::time::Duration;

use wallet_types::{GatewayAck, GatewayError, GatewayOrder, PaymentGateway};

use crate::config::GatewayConfig;
use crate::signer::RequestSigner;

/// reqwest-backed gateway client. Every call is synchronous within
/// the handling of one inbound request and bounded by the configured
/// timeout.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    notify_url: String,
    signer: RequestSigner,
}

impl GatewayClient {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, GatewayError> {
        let signer = RequestSigner::from_config(cfg)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            notify_url: cfg.notify_url.clone(),
            signer,
        })
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, GatewayError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "gateway call rejected");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    /// The gateway's response naming is inconsistent: the transaction
    /// id may appear as `TxnId`, `txnId`, or nested under `data`.
    pub fn extract_txn_id(response: &Value) -> Option<String> {
        let direct = response.get("TxnId").or_else(|| response.get("txnId"));
        let nested = response
            .get("data")
            .and_then(|d| d.get("TxnId").or_else(|| d.get("txnId")));

        direct
            .or(nested)
            .and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    fn ack(response: Value) -> GatewayAck {
        GatewayAck {
            txn_id: Self::extract_txn_id(&response),
            raw: response,
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for GatewayClient {
    #[tracing::instrument(skip(self, order), fields(ref_id = %order.ref_id, amount = %order.amount))]
    async fn direct_payment(&self, order: &GatewayOrder) -> Result<GatewayAck, GatewayError> {
        let token = self
            .signer
            .payment_token(order.amount, &order.reason, &order.method, &order.phone);

        let payload = json!({
            "id": order.ref_id,
            "amount": order.amount.to_major(),
            "reason": order.reason,
            "merchantId": self.signer.merchant_id(),
            "signedToken": token,
            "phoneNumber": order.phone.as_str(),
            "paymentMethod": order.method,
            "notifyUrl": self.notify_url,
        });

        self.post("direct-payment", &payload).await.map(Self::ack)
    }

    #[tracing::instrument(skip(self, order), fields(ref_id = %order.ref_id, amount = %order.amount))]
    async fn payout_transfer(&self, order: &GatewayOrder) -> Result<GatewayAck, GatewayError> {
        let token = self
            .signer
            .payment_token(order.amount, &order.reason, &order.method, &order.phone);

        let payload = json!({
            "id": order.ref_id,
            "clientReference": order.ref_id,
            "amount": order.amount.to_major(),
            "reason": order.reason,
            "merchantId": self.signer.merchant_id(),
            "signedToken": token,
            "receiverAccountNumber": order.phone.as_str(),
            "notifyUrl": self.notify_url,
            "paymentMethod": order.method,
        });

        self.post("payout-transfer", &payload).await.map(Self::ack)
    }

    #[tracing::instrument(skip(self))]
    async fn check_transaction_status(&self, ref_id: &str) -> Result<Value, GatewayError> {
        let payload = json!({
            "id": ref_id,
            "merchantId": self.signer.merchant_id(),
            "signedToken": self.signer.status_token(ref_id),
        });

        self.post("fetch-transaction-status", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_txn_id_shapes() {
        for body in [
            json!({ "TxnId": "GW-1" }),
            json!({ "txnId": "GW-1" }),
            json!({ "data": { "TxnId": "GW-1" } }),
            json!({ "data": { "txnId": "GW-1" } }),
        ] {
            assert_eq!(
                GatewayClient::extract_txn_id(&body).as_deref(),
                Some("GW-1"),
                "{body}"
            );
        }
    }

    #[test]
    fn test_extract_txn_id_numeric() {
        assert_eq!(
            GatewayClient::extract_txn_id(&json!({ "txnId": 42 })).as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_extract_txn_id_absent() {
        assert!(GatewayClient::extract_txn_id(&json!({ "status": "ok" })).is_none());
        assert!(GatewayClient::extract_txn_id(&json!({ "TxnId": "" })).is_none());
    }
}
