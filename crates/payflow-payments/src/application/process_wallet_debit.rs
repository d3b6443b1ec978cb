//! The `ProcessWalletDebit` use case — reacts to `wallet.debited` and
//! `wallet.insufficient.funds`.

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;

use crate::domain::commands::{ProcessWalletDebit, WalletDebitOutcome};
use crate::domain::operation::{OperationKind, PaymentOperation};
use crate::domain::repository::PaymentRepository;

fn validate(command: &ProcessWalletDebit) -> Result<(), DomainError> {
    if !command.amount.is_positive() {
        return Err(DomainError::Validation("amount must be positive".into()));
    }
    match command.outcome {
        WalletDebitOutcome::Completed if command.transaction_id.is_none() => Err(
            DomainError::Validation("transaction id is required for completed debits".into()),
        ),
        WalletDebitOutcome::Failed if command.error_code.is_none() => Err(
            DomainError::Validation("error code is required for failed debits".into()),
        ),
        _ => Ok(()),
    }
}

/// Normalizes a wallet debit outcome into a `wallet`-provider debit
/// operation whose terminal event drives the payment state. The payment
/// itself is not mutated here; `ProcessOperationResult` does that.
///
/// # Errors
///
/// `Validation` for malformed commands or non-wallet payments,
/// `AggregateNotFound` for unknown payments, publish errors otherwise.
pub async fn process_wallet_debit(
    command: &ProcessWalletDebit,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    validate(command)?;

    let payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    if payment.method.wallet_id().is_none() {
        return Err(DomainError::Validation(
            "payment is not a wallet payment".into(),
        ));
    }

    let mut operation = PaymentOperation::new(
        payment.id,
        OperationKind::Debit,
        command.amount.clone(),
        "wallet",
        clock,
    );

    match command.outcome {
        WalletDebitOutcome::Completed => {
            let transaction_id = command
                .transaction_id
                .ok_or_else(|| DomainError::Validation("transaction id is required".into()))?;
            operation.complete(
                &transaction_id.to_string(),
                &command.wallet_id.to_string(),
                clock,
            );
        }
        WalletDebitOutcome::Failed => {
            operation.fail(
                command.error_code.as_deref().unwrap_or("wallet_error"),
                command.error_message.as_deref().unwrap_or(""),
                clock,
            );
        }
    }

    publisher.publish(&operation.take_events()).await?;
    Ok(())
}
