//! # Wallet Hex
//!
//! Application service layer and HTTP adapter for the wallet
//! reconciliation service.
//!
//! ## Architecture
//!
//! - `service` - Initiation flows (topup, withdraw, subscription pay)
//! - `reconcile` - Webhook reconciliation (the only balance mutator)
//! - `subscription` - Subscription payment bridge
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: LedgerRepository` and
//! `G: PaymentGateway`, allowing different adapters to be injected.

pub mod inbound;
mod reconcile;
pub mod service;
mod subscription;

#[cfg(test)]
mod service_tests;

pub use inbound::HttpServer;
pub use service::LedgerService;
