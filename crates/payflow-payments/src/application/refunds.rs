//! Refund initiation and routing.

use serde::Serialize;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::topics;

use crate::domain::aggregates::{Payment, PaymentStatus};
use crate::domain::commands::{ProcessRefund, RefundPayment};
use crate::domain::events::{PaymentRefundInitiated, WalletCreditRequested};
use crate::domain::operation::{OperationKind, PaymentOperation};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

/// Result of a successfully initiated refund.
#[derive(Debug, Clone, Serialize)]
pub struct RefundReceipt {
    /// The refunded payment.
    pub payment_id: Uuid,
    /// Fresh id for this refund attempt.
    pub refund_id: Uuid,
    /// Amount that will be refunded.
    pub amount: Money,
    /// Always `initiated`.
    pub status: String,
}

fn validate_eligibility(payment: &Payment, amount: Option<&Money>) -> Result<(), DomainError> {
    if payment.status != PaymentStatus::Completed {
        return Err(DomainError::Guard(format!(
            "only completed payments can be refunded, payment {} is {}",
            payment.id,
            payment.status.as_str()
        )));
    }

    // A missing or zero amount means a full refund; a partial amount must
    // be positive, match the currency, and fit within the payment.
    if let Some(amount) = amount {
        if amount.amount < 0 {
            return Err(DomainError::Validation(
                "refund amount must be positive".into(),
            ));
        }
        if amount.amount > 0 {
            if amount.currency != payment.amount.currency {
                return Err(DomainError::CurrencyMismatch {
                    left: amount.currency.clone(),
                    right: payment.amount.currency.clone(),
                });
            }
            if amount.amount > payment.amount.amount {
                return Err(DomainError::Validation(
                    "refund amount cannot exceed payment amount".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Validates refund eligibility and publishes `payment.refund.initiated`
/// with a fresh refund id. The reaction (`ProcessRefund`) routes the
/// refund to the funding source.
///
/// # Errors
///
/// `Validation` for malformed commands, `Guard` for non-completed
/// payments, `AggregateNotFound` for unknown payments.
pub async fn refund_payment(
    command: &RefundPayment,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<RefundReceipt, DomainError> {
    if command.reason.trim().is_empty() {
        return Err(DomainError::Validation("reason is required".into()));
    }

    let payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    validate_eligibility(&payment, command.amount.as_ref())?;

    let refund_amount = match &command.amount {
        Some(amount) if amount.amount > 0 => amount.clone(),
        _ => payment.amount.clone(),
    };
    let refund_id = Uuid::new_v4();

    let event = Event::new(
        payment.id,
        topics::PAYMENT_REFUND_INITIATED,
        &PaymentRefundInitiated {
            payment_id: payment.id,
            refund_id,
            amount: refund_amount.clone(),
            reason: command.reason.clone(),
            requested_by: command.requested_by,
            payment_method: payment.method.clone(),
            user_id: payment.user_id,
        },
        clock,
    );
    publisher.publish(&[event]).await?;

    Ok(RefundReceipt {
        payment_id: payment.id,
        refund_id,
        amount: refund_amount,
        status: "initiated".to_owned(),
    })
}

/// Routes an initiated refund by funding method: wallet refunds request a
/// wallet credit; external refunds spawn a refund operation already in
/// `processing` for the external worker.
///
/// # Errors
///
/// `Validation` for malformed commands, `AggregateNotFound` for unknown
/// payments, publish errors otherwise.
pub async fn process_refund(
    command: &ProcessRefund,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    if !command.amount.is_positive() {
        return Err(DomainError::Validation(
            "refund amount must be positive".into(),
        ));
    }
    if command.reason.trim().is_empty() {
        return Err(DomainError::Validation("reason is required".into()));
    }

    let payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    match &payment.method {
        PaymentMethod::Wallet { wallet_id } => {
            let event = Event::new(
                payment.id,
                topics::WALLET_CREDIT_REQUESTED,
                &WalletCreditRequested {
                    payment_id: payment.id,
                    wallet_id: *wallet_id,
                    user_id: command.user_id,
                    amount: command.amount.clone(),
                    reference: format!("Refund for payment {}", payment.id),
                    reason: command.reason.clone(),
                    refund_id: Some(command.refund_id),
                },
                clock,
            );
            publisher.publish(&[event]).await
        }
        PaymentMethod::CreditCard { .. } | PaymentMethod::Debit { .. } => {
            let mut operation = PaymentOperation::new(
                payment.id,
                OperationKind::Refund,
                command.amount.clone(),
                payment.method.type_str(),
                clock,
            );
            operation
                .metadata
                .insert("refund_id".into(), serde_json::json!(command.refund_id));
            operation
                .metadata
                .insert("refund_reason".into(), serde_json::json!(command.reason));
            operation.metadata.insert(
                "requested_by".into(),
                serde_json::json!(command.requested_by),
            );
            operation.process(clock);

            publisher.publish(&operation.take_events()).await
        }
    }
}
