//! Gateway configuration.

use std::env;

use wallet_types::ConfigError;

/// Settings for outbound gateway calls.
///
/// Key material can be supplied three ways, resolved in priority
/// order: inline PEM text, base64-encoded PEM, filesystem path to PEM.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub merchant_id: String,
    pub private_key_pem: Option<String>,
    pub private_key_base64: Option<String>,
    pub private_key_path: Option<String>,
    /// Callback URL the gateway posts notifications to.
    pub notify_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Default commission percentage applied to commissioned credits.
    pub commission_rate_percent: f64,
}

impl GatewayConfig {
    /// Loads gateway settings from environment variables.
    pub fn from_env() -> Self {
        let non_empty = |k: &str| env::var(k).ok().filter(|v| !v.trim().is_empty());

        let notify_url = non_empty("GATEWAY_NOTIFY_URL").unwrap_or_else(|| {
            format!(
                "{}/api/wallet/webhook",
                non_empty("PUBLIC_BASE_URL").unwrap_or_default()
            )
        });

        Self {
            base_url: non_empty("GATEWAY_BASE_URL")
                .unwrap_or_else(|| "https://gateway.santimpay.com/api".to_string()),
            merchant_id: non_empty("GATEWAY_MERCHANT_ID").unwrap_or_default(),
            private_key_pem: non_empty("PRIVATE_KEY_IN_PEM"),
            private_key_base64: non_empty("PRIVATE_KEY_BASE64"),
            private_key_path: non_empty("PRIVATE_KEY_PATH"),
            notify_url,
            timeout_secs: non_empty("GATEWAY_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            commission_rate_percent: non_empty("COMMISSION_RATE_PERCENT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
        }
    }

    /// Resolves the private key to PEM text.
    ///
    /// Priority: inline PEM, then base64-encoded PEM, then a file
    /// path. A later source is only consulted when the earlier ones
    /// are absent or unusable.
    pub fn resolve_private_key_pem(&self) -> Result<String, ConfigError> {
        if let Some(pem) = &self.private_key_pem {
            return Ok(pem.clone());
        }
        if let Some(b64) = &self.private_key_base64 {
            use base64::Engine as _;
            if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64.trim()) {
                if let Ok(pem) = String::from_utf8(bytes) {
                    return Ok(pem);
                }
            }
        }
        if let Some(path) = &self.private_key_path {
            if let Ok(pem) = std::fs::read_to_string(path) {
                return Ok(pem);
            }
        }
        Err(ConfigError::MissingPrivateKey)
    }
}
