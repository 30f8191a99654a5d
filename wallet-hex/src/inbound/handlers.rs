//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use wallet_types::{
    AppError, LedgerRepository, PaymentGateway, Role, SubscriptionId, SubscriptionPayRequest,
    TopupRequest, UserId, WithdrawRequest,
};

use crate::LedgerService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository, G: PaymentGateway> {
    pub service: LedgerService<R, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InsufficientFunds {
                available,
                requested,
            } => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Insufficient funds: available {}, requested {}",
                    available, requested
                ),
            ),
            AppError::Gateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown role: {raw}")).into())
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Start a wallet topup. 202: the outcome arrives by webhook.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, amount = req.amount))]
pub async fn topup<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<TopupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.service.topup(req).await?;
    Ok((StatusCode::ACCEPTED, Json(res)))
}

/// Start a withdrawal. 202: the outcome arrives by webhook.
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, amount = req.amount))]
pub async fn withdraw<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(req): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.service.withdraw(req).await?;
    Ok((StatusCode::ACCEPTED, Json(res)))
}

/// Get a (user, role) wallet.
#[tracing::instrument(skip(state), fields(user_id = %user_id, role = %role))]
pub async fn get_wallet<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&role)?;
    let wallet = state.service.wallet(&UserId::new(user_id), role).await?;
    Ok(Json(wallet))
}

/// Deactivate a (user, role) wallet. Soft delete.
#[tracing::instrument(skip(state), fields(user_id = %user_id, role = %role))]
pub async fn deactivate_wallet<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&role)?;
    state
        .service
        .deactivate_wallet(&UserId::new(user_id), role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List transactions for a user, newest first.
#[tracing::instrument(skip(state), fields(user_id = %user_id))]
pub async fn list_transactions<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.service.transactions(&UserId::new(user_id)).await?;
    Ok(Json(transactions))
}

/// Manual-recovery status lookup at the gateway.
#[tracing::instrument(skip(state), fields(ref_id = %ref_id))]
pub async fn transaction_status<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(ref_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.service.check_status(&ref_id).await?;
    Ok(Json(status))
}

/// Gateway webhook. Answers 200 with `{ok:...}` for every payload
/// that carries an id; 400 only when no id is recognizable.
#[tracing::instrument(skip(state, body))]
pub async fn webhook<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state.service.apply_webhook(&body).await?;
    Ok(Json(ack))
}

/// Start a subscription payment.
#[tracing::instrument(skip(state, req), fields(subscription_id = %id))]
pub async fn pay_subscription<R: LedgerRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionPayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .service
        .pay_subscription(SubscriptionId::new(id), req)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(res)))
}
