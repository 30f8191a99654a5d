//! # Wallet Types
//!
//! Domain types and port traits for the wallet reconciliation service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Wallet, Transaction, the
//!   msisdn/method normalizers, and the canonical notification record)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CURRENCY_CODE, Direction, GatewayNotification, Money, Msisdn, PaymentStatus, Role,
    SubscriptionId, SubscriptionPayment, SubscriptionStatus, Transaction, TransactionId,
    TransactionStatus, UserId, Wallet, WalletId, classify_status, normalize_method,
    normalize_msisdn,
};
pub use dto::*;
pub use error::{AppError, ConfigError, DomainError, GatewayError, RepoError};
pub use ports::{
    GatewayAck, GatewayOrder, LedgerRepository, PaymentGateway, SettleOutcome, SettleRequest,
};
