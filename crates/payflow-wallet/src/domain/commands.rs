//! Commands and queries for the Wallet Service.

use uuid::Uuid;

use super::aggregates::MovementKind;

/// Command to create a wallet movement (income or expense).
#[derive(Debug, Clone)]
pub struct CreateMovement {
    /// Target wallet.
    pub wallet_id: Uuid,
    /// Movement direction.
    pub kind: MovementKind,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Free-form reference. Required.
    pub reference: String,
    /// Payment that caused the movement. Required for expenses.
    pub payment_id: Option<Uuid>,
    /// Optional description.
    pub description: Option<String>,
}

/// Command to revert a movement by creating the opposite movement.
#[derive(Debug, Clone)]
pub struct RevertMovement {
    /// The movement to revert.
    pub movement_id: Uuid,
    /// Why the movement is being reverted.
    pub reason: String,
    /// Who asked for the revert.
    pub requested_by: String,
}

/// Query for one wallet by wallet id or user id — exactly one must be set.
#[derive(Debug, Clone)]
pub struct GetWallet {
    /// Lookup by wallet id.
    pub wallet_id: Option<Uuid>,
    /// Lookup by owning user id.
    pub user_id: Option<Uuid>,
}
