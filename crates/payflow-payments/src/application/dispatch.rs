//! Inbound event dispatch for the Payment Service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use payflow_core::bus::{EventHandler, Publisher};
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::topics;

use crate::application::external_updates::process_external_provider_update;
use crate::application::operation_results::{
    process_inconsistent_payment, process_operation_result,
};
use crate::application::process_payment_method::process_payment_method;
use crate::application::process_wallet_debit::process_wallet_debit;
use crate::application::refunds::process_refund;
use crate::domain::commands::{
    ProcessExternalProviderUpdate, ProcessInconsistentPayment, ProcessOperationResult,
    ProcessPaymentMethod, ProcessRefund, ProcessWalletDebit, WalletDebitOutcome,
};
use crate::domain::events::{
    ExternalProviderUpdate, OperationCompleted, OperationFailed, PaymentCreated,
    PaymentInconsistentState, PaymentRefundInitiated,
};
use crate::domain::operation::{OperationKind, OperationStatus};
use crate::domain::repository::PaymentRepository;

/// Payload of `wallet.debited` as consumed by this service.
#[derive(Debug, Deserialize)]
struct WalletDebitedData {
    wallet_id: Uuid,
    payment_id: Uuid,
    transaction_id: Uuid,
    amount: Money,
}

/// Payload of `wallet.insufficient.funds` as consumed by this service.
#[derive(Debug, Deserialize)]
struct InsufficientFundsData {
    wallet_id: Uuid,
    payment_id: Uuid,
    requested_amount: Money,
    available_balance: Money,
}

fn parse_operation_kind(kind: &str, topic: &str) -> Result<OperationKind, DomainError> {
    match kind {
        "debit" => Ok(OperationKind::Debit),
        "credit" => Ok(OperationKind::Credit),
        "refund" => Ok(OperationKind::Refund),
        "reversal" => Ok(OperationKind::Reversal),
        other => Err(DomainError::Validation(format!(
            "unknown operation type {other} in {topic} payload"
        ))),
    }
}

/// Routes inbound choreography events to the payment use cases.
///
/// Stale references and guard rejections are acknowledged as idempotent
/// no-ops; payload parse failures and infrastructure errors propagate so
/// the bus extends visibility and redelivers.
pub struct PaymentEventDispatcher {
    clock: Arc<dyn Clock>,
    payments: Arc<dyn PaymentRepository>,
    publisher: Arc<dyn Publisher>,
}

impl PaymentEventDispatcher {
    /// Creates the dispatcher with its collaborators.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        payments: Arc<dyn PaymentRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            clock,
            payments,
            publisher,
        }
    }

    fn settle(&self, result: Result<(), DomainError>) -> Result<(), DomainError> {
        match result {
            Err(e) if e.acks_from_handler() => {
                debug!(error = %e, "acknowledging no-op event");
                Ok(())
            }
            other => other,
        }
    }

    async fn on_payment_created(&self, event: &Event) -> Result<(), DomainError> {
        let data: PaymentCreated = event.payload()?;
        process_payment_method(
            &ProcessPaymentMethod {
                payment_id: data.payment_id,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_wallet_debited(&self, event: &Event) -> Result<(), DomainError> {
        let data: WalletDebitedData = event.payload()?;
        process_wallet_debit(
            &ProcessWalletDebit {
                payment_id: data.payment_id,
                wallet_id: data.wallet_id,
                transaction_id: Some(data.transaction_id),
                amount: data.amount,
                outcome: WalletDebitOutcome::Completed,
                error_code: None,
                error_message: None,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_insufficient_funds(&self, event: &Event) -> Result<(), DomainError> {
        let data: InsufficientFundsData = event.payload()?;
        let message = format!(
            "Insufficient funds. Requested: {}, Available: {}",
            data.requested_amount.amount, data.available_balance.amount
        );
        process_wallet_debit(
            &ProcessWalletDebit {
                payment_id: data.payment_id,
                wallet_id: data.wallet_id,
                transaction_id: None,
                amount: data.requested_amount,
                outcome: WalletDebitOutcome::Failed,
                error_code: Some("insufficient_funds".to_owned()),
                error_message: Some(message),
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_external_provider_update(&self, event: &Event) -> Result<(), DomainError> {
        let data: ExternalProviderUpdate = event.payload()?;
        process_external_provider_update(
            &ProcessExternalProviderUpdate {
                provider: data.provider,
                event_type: data.event_type,
                transaction_id: data.transaction_id,
                external_id: data.external_id,
                payment_reference: data.payment_reference,
                amount: data.amount,
                status: data.status,
                error_code: data.error_code,
                error_message: data.error_message,
                metadata: data.metadata,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_operation_completed(&self, event: &Event) -> Result<(), DomainError> {
        let data: OperationCompleted = event.payload()?;
        process_operation_result(
            &ProcessOperationResult {
                operation_id: data.operation_id,
                payment_id: data.payment_id,
                kind: parse_operation_kind(&data.kind, event.topic.as_str())?,
                status: OperationStatus::Completed,
                amount: data.amount,
                provider_transaction_id: Some(data.provider_transaction_id),
                external_transaction_id: Some(data.external_transaction_id),
                error_code: None,
                error_message: None,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_operation_failed(&self, event: &Event) -> Result<(), DomainError> {
        let data: OperationFailed = event.payload()?;
        process_operation_result(
            &ProcessOperationResult {
                operation_id: data.operation_id,
                payment_id: data.payment_id,
                kind: parse_operation_kind(&data.kind, event.topic.as_str())?,
                status: OperationStatus::Failed,
                amount: data.amount,
                provider_transaction_id: None,
                external_transaction_id: None,
                error_code: Some(data.error_code),
                error_message: Some(data.error_message),
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_inconsistent_state(&self, event: &Event) -> Result<(), DomainError> {
        let data: PaymentInconsistentState = event.payload()?;
        process_inconsistent_payment(
            &ProcessInconsistentPayment {
                payment_id: data.payment_id,
                reason: data.reason,
                error_code: data.error_code,
                error_message: data.error_message,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }

    async fn on_refund_initiated(&self, event: &Event) -> Result<(), DomainError> {
        let data: PaymentRefundInitiated = event.payload()?;
        process_refund(
            &ProcessRefund {
                payment_id: data.payment_id,
                refund_id: data.refund_id,
                amount: data.amount,
                reason: data.reason,
                requested_by: data.requested_by,
                payment_method: data.payment_method,
                user_id: data.user_id,
            },
            self.clock.as_ref(),
            self.payments.as_ref(),
            self.publisher.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for PaymentEventDispatcher {
    fn handler_id(&self) -> &str {
        "payment-service-event-dispatcher"
    }

    async fn handle(&self, event: &Event) -> Result<(), DomainError> {
        match event.topic.as_str() {
            topics::PAYMENT_CREATED => self.settle(self.on_payment_created(event).await),
            topics::WALLET_DEBITED => self.settle(self.on_wallet_debited(event).await),
            topics::WALLET_INSUFFICIENT_FUNDS => {
                self.settle(self.on_insufficient_funds(event).await)
            }
            topics::EXTERNAL_PROVIDER_UPDATE => {
                self.settle(self.on_external_provider_update(event).await)
            }
            topics::PAYMENT_OPERATION_COMPLETED => {
                self.settle(self.on_operation_completed(event).await)
            }
            topics::PAYMENT_OPERATION_FAILED => self.settle(self.on_operation_failed(event).await),
            topics::PAYMENT_INCONSISTENT_STATE => {
                self.settle(self.on_inconsistent_state(event).await)
            }
            topics::PAYMENT_REFUND_INITIATED => self.settle(self.on_refund_initiated(event).await),
            other => {
                debug!(topic = other, "ignoring event outside this service");
                Ok(())
            }
        }
    }
}
