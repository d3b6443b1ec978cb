//! Webhook ingestion and external provider update processing.

use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::topics;

use crate::domain::commands::{HandleExternalWebhook, ProcessExternalProviderUpdate};
use crate::domain::events::ExternalProviderUpdate;
use crate::domain::operation::{OperationKind, PaymentOperation};
use crate::domain::repository::PaymentRepository;
use crate::webhooks::{self, NormalizedStatus, SignatureVerifier};

/// Parses a provider webhook, verifies its signature under the configured
/// policy, and publishes the normalized `external.provider.update` event.
///
/// # Errors
///
/// `Validation` for malformed payloads, bad signatures, or unparseable
/// payment references; `Unsupported` for unknown providers.
pub async fn handle_external_webhook(
    command: &HandleExternalWebhook,
    clock: &dyn Clock,
    verifier: &dyn SignatureVerifier,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    if command.provider.is_empty() {
        return Err(DomainError::Validation("provider is required".into()));
    }
    if command.payload.is_empty() {
        return Err(DomainError::Validation("payload is required".into()));
    }

    verifier.verify(
        &command.provider,
        &command.payload,
        command.signature.as_deref(),
    )?;

    let update = webhooks::parse(&command.provider, &command.payload)?;
    let payment_id = Uuid::parse_str(&update.payment_reference)
        .map_err(|e| DomainError::Validation(format!("invalid payment reference: {e}")))?;

    let event = Event::new(
        payment_id,
        topics::EXTERNAL_PROVIDER_UPDATE,
        &ExternalProviderUpdate {
            provider: update.provider,
            event_type: update.event_type,
            transaction_id: update.transaction_id,
            external_id: update.external_id,
            payment_reference: update.payment_reference,
            amount: payflow_core::money::Money::new(update.amount, &*update.currency),
            status: update.status,
            error_code: update.error_code,
            error_message: update.error_message,
            metadata: update.metadata,
            timestamp: update.timestamp.unwrap_or_else(|| clock.now()),
        },
        clock,
    );

    publisher.publish(&[event]).await
}

fn validate_update(command: &ProcessExternalProviderUpdate) -> Result<(), DomainError> {
    if command.provider.is_empty() {
        return Err(DomainError::Validation("provider is required".into()));
    }
    if command.event_type.is_empty() {
        return Err(DomainError::Validation("event type is required".into()));
    }
    if command.payment_reference.is_empty() {
        return Err(DomainError::Validation(
            "payment reference is required".into(),
        ));
    }
    if command.status.is_empty() {
        return Err(DomainError::Validation("status is required".into()));
    }
    if !command.amount.is_positive() {
        return Err(DomainError::Validation("amount must be positive".into()));
    }
    Ok(())
}

/// Applies a normalized provider update by spawning the matching payment
/// operation: the event type selects the operation kind (refunds,
/// reversals, debits) and the status table selects the terminal
/// transition.
///
/// # Errors
///
/// `Validation` for malformed commands or provider/method mismatches,
/// `AggregateNotFound` for unknown payments, `Unsupported` for unknown
/// statuses, publish errors otherwise.
pub async fn process_external_provider_update(
    command: &ProcessExternalProviderUpdate,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    validate_update(command)?;

    let payment_id = Uuid::parse_str(&command.payment_reference)
        .map_err(|e| DomainError::Validation(format!("invalid payment reference: {e}")))?;
    let payment = payments
        .find_by_id(payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(payment_id))?;

    // Provider updates only make sense for externally funded payments.
    if !payment.method.is_external() {
        return Err(DomainError::Validation(
            "payment method provider mismatch".into(),
        ));
    }

    let normalized = webhooks::normalize_status(&command.status, &command.event_type)?;
    let kind = webhooks::operation_kind_for(&command.event_type);

    let mut operation = PaymentOperation::new(
        payment.id,
        kind,
        command.amount.clone(),
        &command.provider,
        clock,
    );
    operation.merge_metadata(&command.metadata);

    match normalized {
        NormalizedStatus::Completed => {
            operation.complete(&command.transaction_id, &command.external_id, clock);
        }
        NormalizedStatus::Failed => {
            operation.fail(
                command.error_code.as_deref().unwrap_or("external_provider_error"),
                command
                    .error_message
                    .as_deref()
                    .unwrap_or("Payment failed at external provider"),
                clock,
            );
        }
        NormalizedStatus::Cancelled => {
            if kind == OperationKind::Reversal {
                // The provider confirmed the undo; a completed reversal
                // cancels the payment downstream.
                operation.complete(&command.transaction_id, &command.external_id, clock);
            } else {
                operation.fail(
                    command.error_code.as_deref().unwrap_or("cancelled"),
                    command
                        .error_message
                        .as_deref()
                        .unwrap_or("Cancelled at external provider"),
                    clock,
                );
            }
        }
        NormalizedStatus::Processing => {
            operation.process(clock);
        }
    }

    publisher.publish(&operation.take_events()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Payment;
    use crate::domain::events::{OperationCompleted, OperationCreated};
    use crate::domain::operation::OperationMetadata;
    use crate::domain::payment_method::PaymentMethod;
    use crate::testing::InMemoryPaymentRepository;
    use crate::webhooks::PermissiveVerifier;
    use chrono::{TimeZone, Utc};
    use payflow_core::money::Money;
    use payflow_test_support::{FixedClock, RecordingPublisher};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn seeded_card_payment(repo: &InMemoryPaymentRepository) -> Uuid {
        let mut payment = Payment::create(
            Uuid::new_v4(),
            Money::new(5000, "USD"),
            PaymentMethod::CreditCard {
                card_token: "tok_42".to_owned(),
            },
            "order 44",
            &clock(),
        )
        .unwrap();
        payment.process(&clock()).unwrap();
        let payment_id = payment.id;
        repo.seed_payment(payment);
        payment_id
    }

    fn update(payment_id: Uuid, event_type: &str, status: &str) -> ProcessExternalProviderUpdate {
        ProcessExternalProviderUpdate {
            provider: "credit_card".to_owned(),
            event_type: event_type.to_owned(),
            transaction_id: "prov-1".to_owned(),
            external_id: "ext-1".to_owned(),
            payment_reference: payment_id.to_string(),
            amount: Money::new(5000, "USD"),
            status: status.to_owned(),
            error_code: None,
            error_message: None,
            metadata: OperationMetadata::new(),
        }
    }

    #[tokio::test]
    async fn test_webhook_ingestion_publishes_normalized_update() {
        // Arrange
        let publisher = RecordingPublisher::new();
        let payment_id = Uuid::new_v4();
        let body = serde_json::json!({
            "event_type": "charge.succeeded",
            "transaction_id": "gw-1",
            "external_id": "ext-1",
            "payment_reference": payment_id.to_string(),
            "amount": 5000,
            "currency": "USD",
            "status": "succeeded",
        });

        // Act
        handle_external_webhook(
            &HandleExternalWebhook {
                provider: "external_gateway".to_owned(),
                payload: serde_json::to_vec(&body).unwrap(),
                signature: None,
            },
            &clock(),
            &PermissiveVerifier,
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(publisher.topics(), vec!["external.provider.update"]);
        let event = publisher.first_with_topic("external.provider.update").unwrap();
        assert_eq!(event.aggregate_id, payment_id);
        let payload: ExternalProviderUpdate = event.payload().unwrap();
        assert_eq!(payload.provider, "external_gateway");
        assert_eq!(payload.status, "succeeded");
        assert_eq!(payload.amount, Money::new(5000, "USD"));
    }

    #[tokio::test]
    async fn test_webhook_rejects_unknown_provider() {
        let publisher = RecordingPublisher::new();

        let result = handle_external_webhook(
            &HandleExternalWebhook {
                provider: "acme".to_owned(),
                payload: b"{}".to_vec(),
                signature: None,
            },
            &clock(),
            &PermissiveVerifier,
            &publisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_completed_update_completes_a_debit_operation() {
        // Arrange
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);

        // Act
        process_external_provider_update(
            &update(payment_id, "charge.succeeded", "succeeded"),
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            publisher.topics(),
            vec!["payment.operation.created", "payment.operation.completed"]
        );
        let completed: OperationCompleted = publisher
            .first_with_topic("payment.operation.completed")
            .unwrap()
            .payload()
            .unwrap();
        assert_eq!(completed.kind, "debit");
        assert_eq!(completed.provider_transaction_id, "prov-1");
    }

    #[tokio::test]
    async fn test_refund_event_type_selects_refund_kind() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);

        process_external_provider_update(
            &update(payment_id, "refund.succeeded", "succeeded"),
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        let created: OperationCreated = publisher
            .first_with_topic("payment.operation.created")
            .unwrap()
            .payload()
            .unwrap();
        assert_eq!(created.kind, "refund");
    }

    #[tokio::test]
    async fn test_cancel_event_completes_a_reversal_operation() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);

        process_external_provider_update(
            &update(payment_id, "payment_intent.canceled", "canceled"),
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        let created: OperationCreated = publisher
            .first_with_topic("payment.operation.created")
            .unwrap()
            .payload()
            .unwrap();
        assert_eq!(created.kind, "reversal");
        // The provider confirmed the cancellation, so the reversal is
        // completed rather than failed.
        assert!(publisher
            .first_with_topic("payment.operation.completed")
            .is_some());
    }

    #[tokio::test]
    async fn test_processing_update_emits_processing_operation() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);

        process_external_provider_update(
            &update(payment_id, "payment_intent.processing", "processing"),
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        assert_eq!(
            publisher.topics(),
            vec!["payment.operation.created", "payment.operation.processing"]
        );
    }

    #[tokio::test]
    async fn test_unknown_status_is_unsupported() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);

        let result = process_external_provider_update(
            &update(payment_id, "charge.weird", "weird"),
            &clock(),
            &repo,
            &publisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_wallet_payment_rejects_provider_update() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment = Payment::create(
            Uuid::new_v4(),
            Money::new(5000, "USD"),
            PaymentMethod::Wallet {
                wallet_id: Uuid::new_v4(),
            },
            "",
            &clock(),
        )
        .unwrap();
        let payment_id = payment.id;
        repo.seed_payment(payment);

        let result = process_external_provider_update(
            &update(payment_id, "charge.succeeded", "succeeded"),
            &clock(),
            &repo,
            &publisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_metadata_is_merged_onto_the_operation() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment_id = seeded_card_payment(&repo);
        let mut command = update(payment_id, "charge.succeeded", "succeeded");
        command
            .metadata
            .insert("batch".into(), serde_json::json!("b-77"));

        // The operation is transient; observable effect is that processing
        // succeeds and the lifecycle events go out.
        process_external_provider_update(&command, &clock(), &repo, &publisher)
            .await
            .unwrap();

        assert_eq!(publisher.topics().len(), 2);
    }
}
