//! Error taxonomy for the wallet service.

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Invalid phone number: {0}")]
    InvalidMsisdn(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Gateway configuration errors. Fatal, surfaced synchronously.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing merchant id")]
    MissingMerchantId,

    #[error("missing private key (set inline PEM, base64 PEM, or a key path)")]
    MissingPrivateKey,

    #[error("unparsable private key: {0}")]
    InvalidPrivateKey(String),
}

/// Outbound gateway call failures. The owning transaction is marked
/// `failed`; a retry is a new transaction with a fresh ref id, never
/// an automatic re-issue.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes. Webhook processing deliberately
/// does NOT use this for "not found" or internal faults — those are
/// converted into a 200-class acknowledgment to stop retry storms.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Gateway failure: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::InsufficientFunds {
                available,
                requested,
            }) => AppError::InsufficientFunds {
                available,
                requested,
            },
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::BadRequest(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            e => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Config(e) => AppError::Internal(e.to_string()),
            e => AppError::Gateway(e.to_string()),
        }
    }
}
