//! The `ProcessPaymentMethod` use case — reacts to `payment.created`.

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::topics;

use crate::domain::commands::ProcessPaymentMethod;
use crate::domain::events::WalletDebitRequested;
use crate::domain::operation::{OperationKind, PaymentOperation};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

/// Moves an initiated payment into `processing` and kicks off funding:
/// wallet payments request a wallet debit, card payments spawn a pending
/// debit operation for the external worker.
///
/// # Errors
///
/// `AggregateNotFound` for unknown payments, `Guard` when the payment is
/// not `initiated` (duplicate delivery), persistence and publish errors
/// otherwise.
pub async fn process_payment_method(
    command: &ProcessPaymentMethod,
    clock: &dyn Clock,
    payments: &dyn PaymentRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    let mut payment = payments
        .find_by_id(command.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.payment_id))?;

    payment.process(clock)?;
    payments.save(&payment).await?;

    let mut events = payment.take_events();
    match &payment.method {
        PaymentMethod::Wallet { wallet_id } => {
            events.push(Event::new(
                payment.id,
                topics::WALLET_DEBIT_REQUESTED,
                &WalletDebitRequested {
                    payment_id: payment.id,
                    wallet_id: *wallet_id,
                    user_id: payment.user_id,
                    amount: payment.amount.clone(),
                    reference: format!("Payment {}", payment.id),
                },
                clock,
            ));
        }
        PaymentMethod::CreditCard { .. } | PaymentMethod::Debit { .. } => {
            let mut operation = PaymentOperation::new(
                payment.id,
                OperationKind::Debit,
                Money::new(payment.amount.amount, &*payment.amount.currency),
                payment.method.type_str(),
                clock,
            );
            events.extend(operation.take_events());
        }
    }

    publisher.publish(&events).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Payment, PaymentStatus};
    use crate::testing::InMemoryPaymentRepository;
    use chrono::{TimeZone, Utc};
    use payflow_test_support::{FixedClock, RecordingPublisher};
    use uuid::Uuid;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn seeded_wallet_payment(repo: &InMemoryPaymentRepository) -> (Uuid, Uuid) {
        let wallet_id = Uuid::new_v4();
        let payment = Payment::create(
            Uuid::new_v4(),
            Money::new(5000, "USD"),
            PaymentMethod::Wallet { wallet_id },
            "order 42",
            &clock(),
        )
        .unwrap();
        let payment_id = payment.id;
        repo.seed_payment(payment);
        (payment_id, wallet_id)
    }

    #[tokio::test]
    async fn test_wallet_payment_requests_debit() {
        // Arrange
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let (payment_id, wallet_id) = seeded_wallet_payment(&repo);

        // Act
        process_payment_method(
            &ProcessPaymentMethod { payment_id },
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(repo.payment(payment_id).status, PaymentStatus::Processing);
        assert_eq!(
            publisher.topics(),
            vec!["payment.processing", "wallet.debit.requested"]
        );

        let event = publisher.first_with_topic("wallet.debit.requested").unwrap();
        let payload: WalletDebitRequested = event.payload().unwrap();
        assert_eq!(payload.payment_id, payment_id);
        assert_eq!(payload.wallet_id, wallet_id);
        assert_eq!(payload.amount, Money::new(5000, "USD"));
        assert_eq!(payload.reference, format!("Payment {payment_id}"));
    }

    #[tokio::test]
    async fn test_card_payment_spawns_debit_operation() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let payment = Payment::create(
            Uuid::new_v4(),
            Money::new(9900, "USD"),
            PaymentMethod::CreditCard {
                card_token: "tok_42".to_owned(),
            },
            "order 43",
            &clock(),
        )
        .unwrap();
        let payment_id = payment.id;
        repo.seed_payment(payment);

        process_payment_method(
            &ProcessPaymentMethod { payment_id },
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        assert_eq!(
            publisher.topics(),
            vec!["payment.processing", "payment.operation.created"]
        );
        let event = publisher
            .first_with_topic("payment.operation.created")
            .unwrap();
        let payload: crate::domain::events::OperationCreated = event.payload().unwrap();
        assert_eq!(payload.payment_id, payment_id);
        assert_eq!(payload.kind, "debit");
        assert_eq!(payload.provider, "credit_card");
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_a_guard_rejection() {
        // Arrange — first delivery transitions to processing.
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();
        let (payment_id, _) = seeded_wallet_payment(&repo);
        process_payment_method(
            &ProcessPaymentMethod { payment_id },
            &clock(),
            &repo,
            &publisher,
        )
        .await
        .unwrap();

        // Act — second delivery of the same payment.created.
        let result = process_payment_method(
            &ProcessPaymentMethod { payment_id },
            &clock(),
            &repo,
            &publisher,
        )
        .await;

        // Assert — guard rejection, no duplicate debit request.
        assert!(matches!(result, Err(DomainError::Guard(_))));
        let debit_requests = publisher
            .topics()
            .iter()
            .filter(|t| *t == "wallet.debit.requested")
            .count();
        assert_eq!(debit_requests, 1);
        assert_eq!(repo.payment(payment_id).version, 2);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_found() {
        let repo = InMemoryPaymentRepository::new();
        let publisher = RecordingPublisher::new();

        let result = process_payment_method(
            &ProcessPaymentMethod {
                payment_id: Uuid::new_v4(),
            },
            &clock(),
            &repo,
            &publisher,
        )
        .await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(_))));
    }
}
