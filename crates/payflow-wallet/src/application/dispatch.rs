//! Inbound event dispatch for the Wallet Service.

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

use crate::application::command_handlers::{create_movement, revert_movement};
use crate::domain::aggregates::MovementKind;
use crate::domain::commands::{CreateMovement, RevertMovement};
use crate::domain::repository::{MovementRepository, TransactionRepository, WalletRepository};

/// Payload of `wallet.debit.requested` as consumed by this service.
#[derive(Debug, Deserialize)]
struct DebitRequested {
    payment_id: Uuid,
    wallet_id: Uuid,
    amount: Money,
    reference: String,
}

/// Payload of `wallet.credit.requested` as consumed by this service.
#[derive(Debug, Deserialize)]
struct CreditRequested {
    payment_id: Uuid,
    wallet_id: Uuid,
    amount: Money,
    reference: String,
}

/// Payload of `wallet.movement.creation.requested`.
#[derive(Debug, Deserialize)]
struct MovementCreationRequested {
    wallet_id: Uuid,
    #[serde(rename = "type")]
    kind: MovementKind,
    amount: i64,
    currency: String,
    reference: String,
    #[serde(default)]
    payment_id: Option<Uuid>,
    #[serde(default)]
    description: Option<String>,
}

/// Payload of `wallet.movement.revert.requested`.
#[derive(Debug, Deserialize)]
struct MovementRevertRequested {
    movement_id: Uuid,
    reason: String,
    requested_by: String,
}

/// Routes inbound choreography events to the wallet use cases.
///
/// Stale references, guard rejections, and insufficient funds are
/// acknowledged (the shortfall already went out as an event); everything
/// else propagates so the bus redelivers.
pub struct WalletEventDispatcher {
    clock: Arc<dyn Clock>,
    wallets: Arc<dyn WalletRepository>,
    transactions: Arc<dyn TransactionRepository>,
    movements: Arc<dyn MovementRepository>,
    publisher: Arc<dyn Publisher>,
}

impl WalletEventDispatcher {
    /// Creates the dispatcher with its collaborators.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        wallets: Arc<dyn WalletRepository>,
        transactions: Arc<dyn TransactionRepository>,
        movements: Arc<dyn MovementRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            clock,
            wallets,
            transactions,
            movements,
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

    async fn on_debit_requested(&self, event: &Event) -> Result<(), DomainError> {
        let data: DebitRequested = event.payload()?;
        let command = CreateMovement {
            wallet_id: data.wallet_id,
            kind: MovementKind::Expense,
            amount: data.amount.amount,
            currency: data.amount.currency,
            reference: data.reference,
            payment_id: Some(data.payment_id),
            description: None,
        };
        create_movement(&command, self.clock.as_ref(), self.wallets.as_ref(), self.publisher.as_ref())
            .await
            .map(|_| ())
    }

    async fn on_credit_requested(&self, event: &Event) -> Result<(), DomainError> {
        let data: CreditRequested = event.payload()?;
        let command = CreateMovement {
            wallet_id: data.wallet_id,
            kind: MovementKind::Income,
            amount: data.amount.amount,
            currency: data.amount.currency,
            reference: data.reference,
            payment_id: Some(data.payment_id),
            description: None,
        };
        create_movement(&command, self.clock.as_ref(), self.wallets.as_ref(), self.publisher.as_ref())
            .await
            .map(|_| ())
    }

    async fn on_movement_creation_requested(&self, event: &Event) -> Result<(), DomainError> {
        let data: MovementCreationRequested = event.payload()?;
        let command = CreateMovement {
            wallet_id: data.wallet_id,
            kind: data.kind,
            amount: data.amount,
            currency: data.currency,
            reference: data.reference,
            payment_id: data.payment_id,
            description: data.description,
        };
        create_movement(&command, self.clock.as_ref(), self.wallets.as_ref(), self.publisher.as_ref())
            .await
            .map(|_| ())
    }

    async fn on_movement_revert_requested(&self, event: &Event) -> Result<(), DomainError> {
        let data: MovementRevertRequested = event.payload()?;
        let command = RevertMovement {
            movement_id: data.movement_id,
            reason: data.reason,
            requested_by: data.requested_by,
        };
        revert_movement(
            &command,
            self.clock.as_ref(),
            self.wallets.as_ref(),
            self.transactions.as_ref(),
            self.movements.as_ref(),
            self.publisher.as_ref(),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl EventHandler for WalletEventDispatcher {
    fn handler_id(&self) -> &str {
        "wallet-service-event-dispatcher"
    }

    async fn handle(&self, event: &Event) -> Result<(), DomainError> {
        match event.topic.as_str() {
            topics::WALLET_DEBIT_REQUESTED => self.settle(self.on_debit_requested(event).await),
            topics::WALLET_CREDIT_REQUESTED => self.settle(self.on_credit_requested(event).await),
            topics::WALLET_MOVEMENT_CREATION_REQUESTED => {
                self.settle(self.on_movement_creation_requested(event).await)
            }
            topics::WALLET_MOVEMENT_REVERT_REQUESTED => {
                self.settle(self.on_movement_revert_requested(event).await)
            }
            other => {
                debug!(topic = other, "ignoring event outside this service");
                Ok(())
            }
        }
    }
}
