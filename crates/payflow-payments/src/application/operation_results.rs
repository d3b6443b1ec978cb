//! Operation result routing and inconsistency compensation.

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::topics;

use crate::domain::aggregates::{Payment, PaymentStatus};
use crate::domain::commands::{ProcessInconsistentPayment, ProcessOperationResult};
use crate::domain::events::{
    InconsistentOperationProcessed, InconsistentOperationStarted, PaymentInconsistentState,
    PaymentRefundFailed, WalletCreditRequested,
};
use crate::domain::operation::{OperationKind, OperationStatus, PaymentOperation};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

/// Applies a terminal operation result to the owning payment:
///
/// | kind     | status    | payment action                    |
/// |----------|-----------|-----------------------------------|
/// | debit    | completed | complete                          |
/// | debit    | failed    | fail                              |
/// | debit    | cancelled | cancel                            |
/// | refund   | completed | record against a completed payment|
/// | refund   | failed    | publish `payment.refund.failed`   |
/// | reversal | completed | cancel                            |
/// | reversal | failed    | publish `payment.inconsistent.state` |
///
/// Non-terminal statuses are no-ops.
///
/// # Errors
///
/// `AggregateNotFound` for unknown payments, `Guard` for out-of-order
/// transitions (duplicate deliveries), persistence and publish errors
/// otherwise.
pub async fn process_operation_result(
    command: &ProcessOperationResult,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    if !command.amount.is_positive() {
        return Err(DomainError::Validation("amount must be positive".into()));
    }

    let mut payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    let mut extra_events = Vec::new();
    match command.kind {
        OperationKind::Debit => apply_debit_result(&mut payment, command, clock)?,
        OperationKind::Refund => {
            apply_refund_result(&payment, command, clock, &mut extra_events)?;
        }
        OperationKind::Reversal => {
            apply_reversal_result(&mut payment, command, clock, &mut extra_events)?;
        }
        OperationKind::Credit => {
            return Err(DomainError::Unsupported(
                "credit operations do not drive payment state".into(),
            ));
        }
    }

    payments.save(&payment).await?;

    let mut events = payment.take_events();
    events.extend(extra_events);
    publisher.publish(&events).await?;
    Ok(())
}

fn apply_debit_result(
    payment: &mut Payment,
    command: &ProcessOperationResult,
    clock: &dyn Clock,
) -> Result<(), DomainError> {
    match command.status {
        OperationStatus::Completed => payment.complete(
            command.provider_transaction_id.as_deref().unwrap_or(""),
            command.external_transaction_id.as_deref().unwrap_or(""),
            clock,
        ),
        OperationStatus::Failed => payment.fail(
            command
                .error_message
                .as_deref()
                .unwrap_or("Payment operation failed"),
            command
                .error_code
                .as_deref()
                .unwrap_or("payment_operation_failed"),
            clock,
        ),
        OperationStatus::Cancelled => payment.cancel(clock),
        OperationStatus::Pending | OperationStatus::Processing => Ok(()),
    }
}

fn apply_refund_result(
    payment: &Payment,
    command: &ProcessOperationResult,
    clock: &dyn Clock,
    extra_events: &mut Vec<Event>,
) -> Result<(), DomainError> {
    match command.status {
        OperationStatus::Completed => {
            // The ledger records the refund; the payment itself stays
            // completed until a refund aggregate exists.
            if payment.status != PaymentStatus::Completed {
                return Err(DomainError::Guard(format!(
                    "can only refund completed payment {}",
                    payment.id
                )));
            }
            Ok(())
        }
        OperationStatus::Failed => {
            extra_events.push(Event::new(
                payment.id,
                topics::PAYMENT_REFUND_FAILED,
                &PaymentRefundFailed {
                    payment_id: payment.id,
                    refund_amount: command.amount.clone(),
                    error_code: command
                        .error_code
                        .clone()
                        .unwrap_or_else(|| "refund_failed".to_owned()),
                    error_message: command.error_message.clone().unwrap_or_default(),
                },
                clock,
            ));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn apply_reversal_result(
    payment: &mut Payment,
    command: &ProcessOperationResult,
    clock: &dyn Clock,
    extra_events: &mut Vec<Event>,
) -> Result<(), DomainError> {
    match command.status {
        OperationStatus::Completed => payment.cancel(clock),
        OperationStatus::Failed => {
            // A failed undo means captured money no longer matches payment
            // state; hand it to the inconsistency use case.
            extra_events.push(Event::new(
                payment.id,
                topics::PAYMENT_INCONSISTENT_STATE,
                &PaymentInconsistentState {
                    payment_id: payment.id,
                    reason: "reversal failed".to_owned(),
                    error_code: command
                        .error_code
                        .clone()
                        .unwrap_or_else(|| "reversal_failed".to_owned()),
                    error_message: command.error_message.clone().unwrap_or_default(),
                },
                clock,
            ));
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Compensates a payment flagged inconsistent: audits the start, applies a
/// status-dependent compensation, and audits the applied action.
///
/// | payment status | compensation                                    |
/// |----------------|-------------------------------------------------|
/// | completed      | full refund via the funding method              |
/// | processing     | cancel, then refund in case money moved         |
/// | failed         | wallet credit in case the debit already landed  |
/// | other          | mark the payment failed                         |
///
/// # Errors
///
/// `Validation` for empty reasons, `AggregateNotFound` for unknown
/// payments, persistence and publish errors otherwise.
pub async fn process_inconsistent_payment(
    command: &ProcessInconsistentPayment,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    if command.reason.trim().is_empty() {
        return Err(DomainError::Validation("reason is required".into()));
    }

    let mut payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    let started = Event::new(
        payment.id,
        topics::PAYMENT_INCONSISTENT_OPERATION_STARTED,
        &InconsistentOperationStarted {
            payment_id: payment.id,
            payment_status: payment.status.as_str().to_owned(),
            reason: command.reason.clone(),
            error_code: command.error_code.clone(),
            error_message: command.error_message.clone(),
        },
        clock,
    );
    publisher.publish(&[started]).await?;

    let status_at_detection = payment.status;
    let action = match status_at_detection {
        PaymentStatus::Completed => {
            let compensation = full_refund_events(&payment, &command.reason, clock);
            publisher.publish(&compensation).await?;
            "full_refund_initiated"
        }
        PaymentStatus::Processing => {
            payment.cancel(clock)?;
            payments.save(&payment).await?;
            publisher.publish(&payment.take_events()).await?;

            // Money may already have been captured; refund as well.
            let compensation = full_refund_events(&payment, &command.reason, clock);
            publisher.publish(&compensation).await?;
            "cancellation_and_refund_initiated"
        }
        PaymentStatus::Failed => {
            // The debit may have landed before the failure was recorded;
            // wallet methods get their money back.
            if let PaymentMethod::Wallet { wallet_id } = payment.method {
                let credit = Event::new(
                    payment.id,
                    topics::WALLET_CREDIT_REQUESTED,
                    &WalletCreditRequested {
                        payment_id: payment.id,
                        wallet_id,
                        user_id: payment.user_id,
                        amount: payment.amount.clone(),
                        reference: format!("Credit for failed inconsistent payment {}", payment.id),
                        reason: command.reason.clone(),
                        refund_id: None,
                    },
                    clock,
                );
                publisher.publish(&[credit]).await?;
            }
            "wallet_credit_initiated"
        }
        PaymentStatus::Initiated | PaymentStatus::Cancelled => {
            payment.fail(&command.error_message, &command.error_code, clock)?;
            payments.save(&payment).await?;
            publisher.publish(&payment.take_events()).await?;
            "payment_marked_failed"
        }
    };

    let processed = Event::new(
        payment.id,
        topics::PAYMENT_INCONSISTENT_OPERATION_PROCESSED,
        &InconsistentOperationProcessed {
            payment_id: payment.id,
            reason: command.reason.clone(),
            action: action.to_owned(),
        },
        clock,
    );
    publisher.publish(&[processed]).await?;
    Ok(())
}

/// Builds the events that initiate a full refund through the payment's
/// funding method.
fn full_refund_events(payment: &Payment, reason: &str, clock: &dyn Clock) -> Vec<Event> {
    match &payment.method {
        PaymentMethod::Wallet { wallet_id } => vec![Event::new(
            payment.id,
            topics::WALLET_CREDIT_REQUESTED,
            &WalletCreditRequested {
                payment_id: payment.id,
                wallet_id: *wallet_id,
                user_id: payment.user_id,
                amount: payment.amount.clone(),
                reference: format!("Refund for inconsistent payment {}", payment.id),
                reason: reason.to_owned(),
                refund_id: None,
            },
            clock,
        )],
        PaymentMethod::CreditCard { .. } | PaymentMethod::Debit { .. } => {
            let mut operation = PaymentOperation::new(
                payment.id,
                OperationKind::Refund,
                payment.amount.clone(),
                payment.method.type_str(),
                clock,
            );
            operation.take_events()
        }
    }
}
