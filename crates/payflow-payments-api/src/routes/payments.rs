//! Payment command and query routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use payflow_core::money::Money;
use payflow_payments::application::create_payment::{create_payment, PaymentReceipt};
use payflow_payments::application::query_handlers::{get_payment, PaymentView};
use payflow_payments::application::refunds::{refund_payment, RefundReceipt};
use payflow_payments::domain::commands::{CreatePayment, GetPayment, RefundPayment};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /payments.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// The paying user.
    pub user_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Method discriminator: `wallet`, `credit_card`, or `debit`.
    pub payment_method_type: String,
    /// Funding wallet, required for wallet payments.
    #[serde(default)]
    pub wallet_id: Option<Uuid>,
    /// Card token, required for card payments.
    #[serde(default)]
    pub card_token: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Request body for POST /payments/{id}/refund.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// Partial refund amount in minor units. Absent or zero means full.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Currency of the partial amount. Required when `amount` is set.
    #[serde(default)]
    pub currency: Option<String>,
    /// Why the refund was requested.
    pub reason: String,
    /// Who requested the refund.
    pub requested_by: Uuid,
}

/// POST /payments
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>), ApiError> {
    let command = CreatePayment {
        user_id: request.user_id,
        amount: request.amount,
        currency: request.currency,
        payment_method_type: request.payment_method_type,
        wallet_id: request.wallet_id,
        card_token: request.card_token,
        description: request.description,
    };

    let receipt = create_payment(
        &command,
        state.clock.as_ref(),
        state.payments.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    info!(payment_id = %receipt.payment_id, "payment created");
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /payments/{`payment_id`}
#[instrument(skip(state), fields(payment_id = %id))]
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, ApiError> {
    let view = get_payment(&GetPayment { payment_id: id }, state.payments.as_ref()).await?;
    Ok(Json(view))
}

/// POST /payments/{`payment_id`}/refund
#[instrument(skip(state, request), fields(payment_id = %id))]
async fn refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundReceipt>, ApiError> {
    let amount = match (request.amount, request.currency) {
        (Some(amount), Some(currency)) => Some(Money::new(amount, currency)),
        (Some(_), None) => {
            return Err(ApiError(payflow_core::error::DomainError::Validation(
                "currency is required when amount is specified".into(),
            )));
        }
        (None, _) => None,
    };

    let command = RefundPayment {
        payment_id: id,
        amount,
        reason: request.reason,
        requested_by: request.requested_by,
    };

    let receipt = refund_payment(
        &command,
        state.clock.as_ref(),
        state.payments.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    info!(refund_id = %receipt.refund_id, "refund initiated");
    Ok(Json(receipt))
}

/// Returns the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments", post(create))
        .route("/payments/{payment_id}", get(get_one))
        .route("/payments/{payment_id}/refund", post(refund))
}
