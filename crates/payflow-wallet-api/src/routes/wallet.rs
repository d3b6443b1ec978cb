//! Wallet query, movement, and revert routes.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use payflow_wallet::application::command_handlers::{
    create_movement, revert_movement, MovementReceipt, RevertReceipt,
};
use payflow_wallet::application::query_handlers::{get_wallet, WalletView};
use payflow_wallet::domain::aggregates::MovementKind;
use payflow_wallet::domain::commands::{CreateMovement, GetWallet, RevertMovement};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/v1/wallet/{id}/movement.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    /// Movement direction: `income` or `expense`.
    #[serde(rename = "type")]
    pub kind: MovementKind,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Free-form reference.
    pub reference: String,
    /// Payment that caused the movement. Required for expenses.
    #[serde(default)]
    pub payment_id: Option<Uuid>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for POST /api/v1/movement/{movement_id}/revert.
#[derive(Debug, Deserialize)]
pub struct RevertMovementRequest {
    /// Why the movement is being reverted.
    pub reason: String,
    /// Who asked for the revert.
    pub requested_by: String,
}

/// GET /api/v1/wallet/{id}
#[instrument(skip(state), fields(wallet_id = %id))]
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalletView>, ApiError> {
    let view = get_wallet(
        &GetWallet {
            wallet_id: Some(id),
            user_id: None,
        },
        state.wallets.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// POST /api/v1/wallet/{id}/movement
#[instrument(skip(state, request), fields(wallet_id = %id))]
async fn movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateMovementRequest>,
) -> Result<Json<MovementReceipt>, ApiError> {
    let command = CreateMovement {
        wallet_id: id,
        kind: request.kind,
        amount: request.amount,
        currency: request.currency,
        reference: request.reference,
        payment_id: request.payment_id,
        description: request.description,
    };

    let receipt = create_movement(
        &command,
        state.clock.as_ref(),
        state.wallets.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    info!(transaction_id = %receipt.transaction_id, "movement created");
    Ok(Json(receipt))
}

/// POST /api/v1/movement/{`movement_id`}/revert
#[instrument(skip(state, request), fields(movement_id = %movement_id))]
async fn revert(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
    Json(request): Json<RevertMovementRequest>,
) -> Result<Json<RevertReceipt>, ApiError> {
    let command = RevertMovement {
        movement_id,
        reason: request.reason,
        requested_by: request.requested_by,
    };

    let receipt = revert_movement(
        &command,
        state.clock.as_ref(),
        state.wallets.as_ref(),
        state.transactions.as_ref(),
        state.movements.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    info!(
        reversal_transaction_id = %receipt.reversal_transaction_id,
        "movement reverted"
    );
    Ok(Json(receipt))
}

/// Returns the wallet router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/wallet/{id}", get(get_one))
        .route("/api/v1/wallet/{id}/movement", post(movement))
        .route("/api/v1/movement/{movement_id}/revert", post(revert))
}
