//! The `CreatePayment` use case.

use serde::Serialize;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::money::Money;

use crate::domain::aggregates::Payment;
use crate::domain::commands::CreatePayment;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

/// Result of a successful payment creation.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    /// The new payment's id.
    pub payment_id: Uuid,
}

fn validate(command: &CreatePayment) -> Result<(), DomainError> {
    if command.amount <= 0 {
        return Err(DomainError::Validation("amount must be positive".into()));
    }
    if command.currency.is_empty() {
        return Err(DomainError::Validation("currency is required".into()));
    }
    if command.payment_method_type.is_empty() {
        return Err(DomainError::Validation(
            "payment method type is required".into(),
        ));
    }
    Ok(())
}

/// Creates a payment in `initiated`, persists it, and publishes
/// `payment.created` to start the choreography.
///
/// # Errors
///
/// `Validation`/`Unsupported` for bad input, persistence and publish
/// errors otherwise.
pub async fn create_payment(
    command: &CreatePayment,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<PaymentReceipt, DomainError> {
    validate(command)?;

    let method = PaymentMethod::from_request(
        &command.payment_method_type,
        command.wallet_id,
        command.card_token.as_deref(),
    )?;
    let amount = Money::new(command.amount, &*command.currency);

    let mut payment = Payment::create(
        command.user_id,
        amount,
        method,
        &command.description,
        clock,
    )?;

    payments.save(&payment).await?;
    publisher.publish(&payment.take_events()).await?;

    Ok(PaymentReceipt {
        payment_id: payment.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::PaymentStatus;
    use crate::domain::events::PaymentCreated;
    use crate::testing::InMemoryPaymentRepository;
    use chrono::{TimeZone, Utc};
    use payflow_test_support::{FixedClock, RecordingPublisher};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn wallet_command() -> CreatePayment {
        CreatePayment {
            user_id: Uuid::new_v4(),
            amount: 5000,
            currency: "USD".to_owned(),
            payment_method_type: "wallet".to_owned(),
            wallet_id: Some(Uuid::new_v4()),
            card_token: None,
            description: "order 42".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_payment_persists_and_publishes_created_event() {
        // Arrange
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let command = wallet_command();

        // Act
        let receipt = create_payment(&command, &clock(), &repo, &publisher)
            .await
            .unwrap();

        // Assert
        let stored = repo.payment(receipt.payment_id);
        assert_eq!(stored.status, PaymentStatus::Initiated);
        assert_eq!(stored.amount, Money::new(5000, "USD"));
        assert_eq!(stored.version, 1);

        assert_eq!(publisher.topics(), vec!["payment.created"]);
        let event = publisher.first_with_topic("payment.created").unwrap();
        let payload: PaymentCreated = event.payload().unwrap();
        assert_eq!(payload.payment_id, receipt.payment_id);
        assert_eq!(payload.user_id, command.user_id);
        assert_eq!(payload.payment_method.wallet_id(), command.wallet_id);
    }

    #[tokio::test]
    async fn test_create_payment_card_method_requires_token() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let command = CreatePayment {
            payment_method_type: "credit_card".to_owned(),
            wallet_id: None,
            card_token: None,
            ..wallet_command()
        };

        let result = create_payment(&command, &clock(), &repo, &publisher).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(publisher.topics().is_empty());
    }

    #[tokio::test]
    async fn test_create_payment_wallet_method_requires_wallet_id() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let command = CreatePayment {
            wallet_id: None,
            ..wallet_command()
        };

        let result = create_payment(&command, &clock(), &repo, &publisher).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_payment_rejects_non_positive_amount() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let command = CreatePayment {
            amount: 0,
            ..wallet_command()
        };

        let result = create_payment(&command, &clock(), &repo, &publisher).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_payment_rejects_unknown_method_type() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let command = CreatePayment {
            payment_method_type: "crypto".to_owned(),
            ..wallet_command()
        };

        let result = create_payment(&command, &clock(), &repo, &publisher).await;

        assert!(matches!(result, Err(DomainError::Unsupported(_))));
    }
}
