//! Domain event payloads for the Wallet Service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use payflow_core::money::Money;

/// Emitted when a wallet is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletOpened {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The wallet currency.
    pub currency: String,
}

/// Emitted when a debit succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDebited {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The payment that caused the debit.
    pub payment_id: Uuid,
    /// The ledger transaction written for the debit.
    pub transaction_id: Uuid,
    /// Amount debited.
    pub amount: Money,
    /// Balance before the debit.
    pub balance_before: Money,
    /// Balance after the debit.
    pub balance_after: Money,
    /// Free-form reference.
    pub reference: String,
}

/// Emitted when a credit succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCredited {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The ledger transaction written for the credit.
    pub transaction_id: Uuid,
    /// Amount credited.
    pub amount: Money,
    /// Balance before the credit.
    pub balance_before: Money,
    /// Balance after the credit.
    pub balance_after: Money,
    /// Free-form reference.
    pub reference: String,
}

/// Emitted when a debit is rejected for lack of funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsufficientFundsDetected {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The payment whose debit was rejected.
    pub payment_id: Uuid,
    /// Amount the debit asked for.
    pub requested_amount: Money,
    /// Balance at the time of the attempt.
    pub available_balance: Money,
    /// How much was missing.
    pub shortfall: Money,
}

/// Emitted when a wallet is frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFrozen {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
}

/// Emitted when a wallet is unfrozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletUnfrozen {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
}

/// Emitted alongside each balance-affecting transaction's movement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMovementCreated {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The ledger transaction backing the movement.
    pub transaction_id: Uuid,
    /// The movement row written.
    pub movement_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// Movement direction, `income` or `expense`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount moved.
    pub amount: Money,
    /// Balance before the movement.
    pub balance_before: Money,
    /// Balance after the movement.
    pub balance_after: Money,
    /// Free-form reference.
    pub reference: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Payment that caused the movement, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,
}

/// Emitted when a movement is reverted by an opposite movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMovementReverted {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// The transaction being reverted.
    pub original_transaction_id: Uuid,
    /// The compensating transaction.
    pub reversal_transaction_id: Uuid,
    /// Kind of the original transaction, e.g. `credit`.
    pub original_type: String,
    /// Amount moved back.
    pub amount: Money,
    /// Balance before the reversal.
    pub balance_before: Money,
    /// Balance after the reversal.
    pub balance_after: Money,
    /// Why the movement was reverted.
    pub reason: String,
    /// Who asked for the revert.
    pub requested_by: String,
    /// Payment tied to the original transaction, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,
}
