//! # Wallet Gateway
//!
//! Outbound adapter for the payment gateway: ES256 request signing
//! and the reqwest HTTP client implementing the `PaymentGateway` port.
//!
//! Signing and HTTP transport are deliberately separate so the token
//! algorithm and key-resolution policy stay testable without a
//! network.

pub mod client;
pub mod config;
pub mod signer;

pub use client::GatewayClient;
pub use config::GatewayConfig;
pub use signer::RequestSigner;
