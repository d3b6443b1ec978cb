//! Command handlers for the Wallet Service.

use serde::Serialize;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::topics;

use crate::domain::aggregates::{Movement, MovementKind, Transaction, TransactionKind, Wallet, WalletStatus};
use crate::domain::commands::{CreateMovement, RevertMovement};
use crate::domain::events::{WalletMovementCreated, WalletMovementReverted};
use crate::domain::repository::{MovementRepository, TransactionRepository, WalletRepository};

/// Result of a successful movement creation.
#[derive(Debug, Clone, Serialize)]
pub struct MovementReceipt {
    /// The ledger transaction written.
    pub transaction_id: Uuid,
    /// The movement row written.
    pub movement_id: Uuid,
    /// The wallet that changed.
    pub wallet_id: Uuid,
    /// Movement direction, `income` or `expense`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount moved.
    pub amount: Money,
    /// Balance after the movement.
    pub balance_after: Money,
}

/// Result of a successful movement revert.
#[derive(Debug, Clone, Serialize)]
pub struct RevertReceipt {
    /// The compensating transaction written.
    pub reversal_transaction_id: Uuid,
    /// The transaction that was reverted.
    pub original_transaction_id: Uuid,
    /// The wallet that changed.
    pub wallet_id: Uuid,
    /// Amount moved back.
    pub amount: Money,
    /// Balance after the reversal.
    pub balance_after: Money,
}

fn validate_create(command: &CreateMovement) -> Result<(), DomainError> {
    if command.amount <= 0 {
        return Err(DomainError::Validation("amount must be positive".into()));
    }
    if command.currency.is_empty() {
        return Err(DomainError::Validation("currency is required".into()));
    }
    if command.reference.trim().is_empty() {
        return Err(DomainError::Validation("reference is required".into()));
    }
    if command.kind == MovementKind::Expense && command.payment_id.is_none() {
        return Err(DomainError::Validation(
            "payment id is required for expense movements".into(),
        ));
    }
    Ok(())
}

/// Handles `CreateMovement`: applies the credit or debit, writes the
/// transaction and its movement row in one unit of work, and publishes the
/// wallet's events plus `wallet.movement.created`.
///
/// A rejected debit still publishes the pending
/// `wallet.insufficient.funds` event before surfacing the error, so the
/// payment choreography can observe the shortfall.
///
/// # Errors
///
/// `Validation` for malformed commands, `AggregateNotFound` for unknown
/// wallets, `InsufficientFunds`/`Guard`/`CurrencyMismatch` from the
/// aggregate, and persistence errors from the repository.
pub async fn create_movement(
    command: &CreateMovement,
    clock: &dyn Clock,
    wallets: &dyn WalletRepository,
    publisher: &dyn Publisher,
) -> Result<MovementReceipt, DomainError> {
    validate_create(command)?;

    let mut wallet = wallets
        .find_by_id(command.wallet_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.wallet_id))?;

    let amount = Money::new(command.amount, &*command.currency);
    let applied = match command.kind {
        MovementKind::Income => {
            wallet.credit(amount, &command.reference, command.payment_id, clock)
        }
        MovementKind::Expense => {
            // Presence checked in validate_create.
            let payment_id = command
                .payment_id
                .ok_or_else(|| DomainError::Validation("payment id is required".into()))?;
            wallet.debit(amount, payment_id, &command.reference, clock)
        }
    };

    let transaction = match applied {
        Ok(transaction) => transaction,
        Err(e) => {
            let events = wallet.take_events();
            if !events.is_empty() {
                publisher.publish(&events).await?;
            }
            return Err(e);
        }
    };

    let movement = Movement::record(
        wallet.id,
        command.kind,
        transaction.amount.clone(),
        transaction.id,
        &command.reference,
        command.description.clone(),
        clock,
    );

    wallets
        .save_with_entries(&wallet, &transaction, &movement)
        .await?;

    let mut events = wallet.take_events();
    events.push(Event::new(
        wallet.id,
        topics::WALLET_MOVEMENT_CREATED,
        &WalletMovementCreated {
            wallet_id: wallet.id,
            transaction_id: transaction.id,
            movement_id: movement.id,
            user_id: wallet.user_id,
            kind: command.kind.as_str().to_owned(),
            amount: transaction.amount.clone(),
            balance_before: transaction.balance_before.clone(),
            balance_after: transaction.balance_after.clone(),
            reference: command.reference.clone(),
            description: command.description.clone(),
            payment_id: command.payment_id,
        },
        clock,
    ));
    publisher.publish(&events).await?;

    Ok(MovementReceipt {
        transaction_id: transaction.id,
        movement_id: movement.id,
        wallet_id: wallet.id,
        kind: command.kind.as_str().to_owned(),
        amount: transaction.amount.clone(),
        balance_after: wallet.balance.clone(),
    })
}

fn validate_revert(command: &RevertMovement) -> Result<(), DomainError> {
    if command.reason.trim().is_empty() {
        return Err(DomainError::Validation("reason is required".into()));
    }
    if command.requested_by.trim().is_empty() {
        return Err(DomainError::Validation("requested by is required".into()));
    }
    Ok(())
}

fn check_revert_eligibility(
    transaction: &Transaction,
    wallet: &Wallet,
) -> Result<(), DomainError> {
    if wallet.status == WalletStatus::Closed {
        return Err(DomainError::Guard(format!(
            "cannot revert movements on closed wallet {}",
            wallet.id
        )));
    }
    // Credit-like originals revert into a debit and need cover for it.
    if matches!(
        transaction.kind,
        TransactionKind::Credit | TransactionKind::Refund
    ) && !wallet.can_debit(&transaction.amount)
    {
        return Err(DomainError::InsufficientFunds {
            requested: transaction.amount.clone(),
            available: wallet.balance.clone(),
        });
    }
    Ok(())
}

/// Handles `RevertMovement`: writes the opposite transaction and movement,
/// and publishes `wallet.movement.reverted` carrying both transaction ids.
///
/// # Errors
///
/// `AggregateNotFound` when the movement, transaction, or wallet is
/// missing; `Guard` on closed wallets; `InsufficientFunds` when a
/// credit-revert cannot be covered; `Unsupported` for adjustment entries.
pub async fn revert_movement(
    command: &RevertMovement,
    clock: &dyn Clock,
    wallets: &dyn WalletRepository,
    transactions: &dyn TransactionRepository,
    movements: &dyn MovementRepository,
    publisher: &dyn Publisher,
) -> Result<RevertReceipt, DomainError> {
    validate_revert(command)?;

    let movement = movements
        .find_by_id(command.movement_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.movement_id))?;
    let transaction_id = movement.transaction_id.ok_or_else(|| {
        DomainError::Validation(format!(
            "movement {} has no ledger transaction",
            movement.id
        ))
    })?;
    let original = transactions
        .find_by_id(transaction_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(transaction_id))?;
    let mut wallet = wallets
        .find_by_id(original.wallet_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(original.wallet_id))?;

    check_revert_eligibility(&original, &wallet)?;

    let reference = format!("Revert: {} - {}", original.reference, command.reason);
    let reversal = match original.kind {
        TransactionKind::Credit | TransactionKind::Refund => {
            // Reversal of money-in is a debit; reuse the original payment
            // reference when there is one.
            let payment_id = original.payment_id.unwrap_or_else(Uuid::new_v4);
            wallet.debit(original.amount.clone(), payment_id, &reference, clock)?
        }
        TransactionKind::Debit => {
            wallet.credit(original.amount.clone(), &reference, original.payment_id, clock)?
        }
        TransactionKind::Adjustment => {
            return Err(DomainError::Unsupported(
                "adjustment entries cannot be reverted".into(),
            ));
        }
    };

    let reversal_movement = Movement::record(
        wallet.id,
        movement.kind.opposite(),
        reversal.amount.clone(),
        reversal.id,
        &reference,
        Some(format!("Revert requested by {}", command.requested_by)),
        clock,
    );

    wallets
        .save_with_entries(&wallet, &reversal, &reversal_movement)
        .await?;

    let mut events = wallet.take_events();
    events.push(Event::new(
        wallet.id,
        topics::WALLET_MOVEMENT_REVERTED,
        &WalletMovementReverted {
            wallet_id: wallet.id,
            user_id: wallet.user_id,
            original_transaction_id: original.id,
            reversal_transaction_id: reversal.id,
            original_type: original.kind.as_str().to_owned(),
            amount: original.amount.clone(),
            balance_before: reversal.balance_before.clone(),
            balance_after: reversal.balance_after.clone(),
            reason: command.reason.clone(),
            requested_by: command.requested_by.clone(),
            payment_id: original.payment_id,
        },
        clock,
    ));
    publisher.publish(&events).await?;

    Ok(RevertReceipt {
        reversal_transaction_id: reversal.id,
        original_transaction_id: original.id,
        wallet_id: wallet.id,
        amount: reversal.amount.clone(),
        balance_after: wallet.balance.clone(),
    })
}
