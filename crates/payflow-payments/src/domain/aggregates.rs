//! The payment aggregate root.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::timestamps::Timestamps;
use payflow_core::topics;

use super::events::{
    PaymentCancelled, PaymentCompleted, PaymentCreated, PaymentFailed, PaymentProcessing,
};
use super::payment_method::PaymentMethod;

/// Lifecycle status of a payment.
///
/// ```text
/// initiated ──process──▶ processing ──complete──▶ completed
///    │                       │                      (terminal)
///    │                       ├─fail──▶ failed        (terminal)
///    │                       └─cancel─▶ cancelled    (terminal)
///    └─fail/cancel from initiated also permitted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created, funding not yet attempted.
    Initiated,
    /// Funding in flight.
    Processing,
    /// Funds captured. Terminal; only refundable.
    Completed,
    /// Funding failed. Terminal.
    Failed,
    /// Reversed or abandoned. Terminal.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the status as its persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown values.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "initiated" => Ok(PaymentStatus::Initiated),
            "processing" => Ok(PaymentStatus::Processing),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// The aggregate root owning one payment's lifecycle.
#[derive(Debug, Clone)]
pub struct Payment {
    /// Payment identifier.
    pub id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount to move.
    pub amount: Money,
    /// How the payment is funded.
    pub method: PaymentMethod,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: PaymentStatus,
    /// Creation/update instants.
    pub timestamps: Timestamps,
    /// Optimistic-locking version.
    pub version: i64,

    pending_events: Vec<Event>,
}

impl Payment {
    /// Creates a payment in `initiated` and records `payment.created`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the amount is not positive.
    pub fn create(
        user_id: Uuid,
        amount: Money,
        method: PaymentMethod,
        description: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::Validation("amount must be positive".into()));
        }

        let mut payment = Self {
            id: Uuid::new_v4(),
            user_id,
            amount: amount.clone(),
            method: method.clone(),
            description: description.to_owned(),
            status: PaymentStatus::Initiated,
            timestamps: Timestamps::new(clock),
            version: 1,
            pending_events: Vec::new(),
        };

        let event = Event::new(
            payment.id,
            topics::PAYMENT_CREATED,
            &PaymentCreated {
                payment_id: payment.id,
                user_id,
                amount,
                payment_method: method,
                description: payment.description.clone(),
            },
            clock,
        );
        payment.record(event);
        Ok(payment)
    }

    /// Rebuilds a payment from its persisted state. Records no events.
    #[must_use]
    pub fn from_stored(
        id: Uuid,
        user_id: Uuid,
        amount: Money,
        method: PaymentMethod,
        description: String,
        status: PaymentStatus,
        timestamps: Timestamps,
        version: i64,
    ) -> Self {
        Self {
            id,
            user_id,
            amount,
            method,
            description,
            status,
            timestamps,
            version,
            pending_events: Vec::new(),
        }
    }

    /// Moves the payment into `processing`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` unless the payment is `initiated`.
    pub fn process(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Initiated {
            return Err(DomainError::Guard(format!(
                "payment {} can only be processed from initiated, was {}",
                self.id,
                self.status.as_str()
            )));
        }

        self.status = PaymentStatus::Processing;
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_PROCESSING,
            &PaymentProcessing {
                payment_id: self.id,
                user_id: self.user_id,
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    /// Completes the payment with the funding source's identifiers.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` unless the payment is `processing`.
    pub fn complete(
        &mut self,
        provider_transaction_id: &str,
        external_transaction_id: &str,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Processing {
            return Err(DomainError::Guard(format!(
                "payment {} can only be completed from processing, was {}",
                self.id,
                self.status.as_str()
            )));
        }

        self.status = PaymentStatus::Completed;
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_COMPLETED,
            &PaymentCompleted {
                payment_id: self.id,
                user_id: self.user_id,
                amount: self.amount.clone(),
                provider_transaction_id: provider_transaction_id.to_owned(),
                external_transaction_id: external_transaction_id.to_owned(),
                completed_at: clock.now(),
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    /// Fails the payment with a reason and machine-readable code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` when the payment is already
    /// `completed`.
    pub fn fail(
        &mut self,
        reason: &str,
        error_code: &str,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status == PaymentStatus::Completed {
            return Err(DomainError::Guard(format!(
                "cannot fail completed payment {}",
                self.id
            )));
        }

        self.status = PaymentStatus::Failed;
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_FAILED,
            &PaymentFailed {
                payment_id: self.id,
                user_id: self.user_id,
                amount: self.amount.clone(),
                reason: reason.to_owned(),
                error_code: error_code.to_owned(),
                failed_at: clock.now(),
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    /// Cancels the payment.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` when the payment is already
    /// `completed`.
    pub fn cancel(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.status == PaymentStatus::Completed {
            return Err(DomainError::Guard(format!(
                "cannot cancel completed payment {}",
                self.id
            )));
        }

        self.status = PaymentStatus::Cancelled;
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_CANCELLED,
            &PaymentCancelled {
                payment_id: self.id,
                user_id: self.user_id,
                cancelled_at: clock.now(),
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    fn touch(&mut self, clock: &dyn Clock) {
        self.timestamps.touch(clock);
        self.version += 1;
    }

    fn record(&mut self, event: Event) {
        self.pending_events.push(event);
    }
}

impl AggregateRoot for Payment {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn pending_events(&self) -> &[Event] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}
