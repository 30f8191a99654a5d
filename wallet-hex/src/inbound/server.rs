//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use wallet_types::{LedgerRepository, PaymentGateway};

use super::handlers::{self, AppState};
use crate::LedgerService;

/// HTTP Server for the wallet API.
pub struct HttpServer<R: LedgerRepository, G: PaymentGateway> {
    state: Arc<AppState<R, G>>,
}

impl<R: LedgerRepository, G: PaymentGateway> HttpServer<R, G> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: LedgerService<R, G>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/wallet/topup", post(handlers::topup::<R, G>))
            .route("/api/wallet/withdraw", post(handlers::withdraw::<R, G>))
            .route("/api/wallet/webhook", post(handlers::webhook::<R, G>))
            .route(
                "/api/wallet/{user_id}/transactions",
                get(handlers::list_transactions::<R, G>),
            )
            .route(
                "/api/wallet/{user_id}/{role}",
                get(handlers::get_wallet::<R, G>).delete(handlers::deactivate_wallet::<R, G>),
            )
            .route(
                "/api/transactions/{ref_id}/status",
                get(handlers::transaction_status::<R, G>),
            )
            .route(
                "/api/subscriptions/{id}/pay",
                post(handlers::pay_subscription::<R, G>),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
