//! Payment operations — the ledger of funding-source interactions.

use std::collections::BTreeMap;

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
    OperationCompleted, OperationCreated, OperationFailed, OperationProcessing,
};

/// Free-form metadata carried by an operation.
pub type OperationMetadata = BTreeMap<String, serde_json::Value>;

/// What the operation does to the funding source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Money taken from the funding source.
    Debit,
    /// Money returned to the funding source.
    Credit,
    /// Money returned after completion.
    Refund,
    /// The original capture undone (cancellation, dispute).
    Reversal,
}

impl OperationKind {
    /// Returns the kind as its persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Debit => "debit",
            OperationKind::Credit => "credit",
            OperationKind::Refund => "refund",
            OperationKind::Reversal => "reversal",
        }
    }
}

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Created, waiting for a worker.
    Pending,
    /// In flight at the provider.
    Processing,
    /// Finished successfully. Terminal.
    Completed,
    /// Finished unsuccessfully. Terminal.
    Failed,
    /// Abandoned before settling. Terminal.
    Cancelled,
}

/// One interaction with a funding source. Type and provider are fixed at
/// creation; terminal transitions publish exactly one completion or
/// failure event that drives the owning payment's state.
#[derive(Debug, Clone)]
pub struct PaymentOperation {
    /// Operation identifier.
    pub id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
    /// What this operation does. Immutable.
    pub kind: OperationKind,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// Amount involved.
    pub amount: Money,
    /// Which provider settles the operation. Immutable.
    pub provider: String,
    /// Provider-assigned transaction id, set on completion.
    pub provider_transaction_id: Option<String>,
    /// Secondary external id, set on completion.
    pub external_transaction_id: Option<String>,
    /// Machine-readable error code, set on failure.
    pub error_code: Option<String>,
    /// Human-readable error message, set on failure.
    pub error_message: Option<String>,
    /// Free-form metadata.
    pub metadata: OperationMetadata,
    /// Creation/update instants.
    pub timestamps: Timestamps,
    /// Version counter.
    pub version: i64,

    pending_events: Vec<Event>,
}

impl PaymentOperation {
    /// Creates a pending operation and records `payment.operation.created`.
    #[must_use]
    pub fn new(
        payment_id: Uuid,
        kind: OperationKind,
        amount: Money,
        provider: &str,
        clock: &dyn Clock,
    ) -> Self {
        let mut operation = Self {
            id: Uuid::new_v4(),
            payment_id,
            kind,
            status: OperationStatus::Pending,
            amount: amount.clone(),
            provider: provider.to_owned(),
            provider_transaction_id: None,
            external_transaction_id: None,
            error_code: None,
            error_message: None,
            metadata: OperationMetadata::new(),
            timestamps: Timestamps::new(clock),
            version: 1,
            pending_events: Vec::new(),
        };

        let event = Event::new(
            operation.id,
            topics::PAYMENT_OPERATION_CREATED,
            &OperationCreated {
                operation_id: operation.id,
                payment_id,
                kind: kind.as_str().to_owned(),
                amount,
                provider: provider.to_owned(),
            },
            clock,
        );
        operation.record(event);
        operation
    }

    /// Marks the operation as in flight at the provider.
    pub fn process(&mut self, clock: &dyn Clock) {
        self.status = OperationStatus::Processing;
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_OPERATION_PROCESSING,
            &OperationProcessing {
                operation_id: self.id,
                payment_id: self.payment_id,
            },
            clock,
        );
        self.record(event);
    }

    /// Completes the operation with the provider's identifiers.
    pub fn complete(
        &mut self,
        provider_transaction_id: &str,
        external_transaction_id: &str,
        clock: &dyn Clock,
    ) {
        self.status = OperationStatus::Completed;
        self.provider_transaction_id = Some(provider_transaction_id.to_owned());
        self.external_transaction_id = Some(external_transaction_id.to_owned());
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_OPERATION_COMPLETED,
            &OperationCompleted {
                operation_id: self.id,
                payment_id: self.payment_id,
                kind: self.kind.as_str().to_owned(),
                amount: self.amount.clone(),
                provider: self.provider.clone(),
                provider_transaction_id: provider_transaction_id.to_owned(),
                external_transaction_id: external_transaction_id.to_owned(),
                completed_at: clock.now(),
            },
            clock,
        );
        self.record(event);
    }

    /// Fails the operation with error details.
    pub fn fail(&mut self, error_code: &str, error_message: &str, clock: &dyn Clock) {
        self.status = OperationStatus::Failed;
        self.error_code = Some(error_code.to_owned());
        self.error_message = Some(error_message.to_owned());
        self.touch(clock);

        let event = Event::new(
            self.id,
            topics::PAYMENT_OPERATION_FAILED,
            &OperationFailed {
                operation_id: self.id,
                payment_id: self.payment_id,
                kind: self.kind.as_str().to_owned(),
                amount: self.amount.clone(),
                provider: self.provider.clone(),
                error_code: error_code.to_owned(),
                error_message: error_message.to_owned(),
                failed_at: clock.now(),
            },
            clock,
        );
        self.record(event);
    }

    /// Copies external metadata onto the operation.
    pub fn merge_metadata(&mut self, metadata: &OperationMetadata) {
        for (key, value) in metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
    }

    fn touch(&mut self, clock: &dyn Clock) {
        self.timestamps.touch(clock);
        self.version += 1;
    }

    fn record(&mut self, event: Event) {
        self.pending_events.push(event);
    }
}

impl AggregateRoot for PaymentOperation {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use payflow_test_support::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn debit_operation() -> PaymentOperation {
        PaymentOperation::new(
            Uuid::new_v4(),
            OperationKind::Debit,
            Money::new(5000, "USD"),
            "wallet",
            &clock(),
        )
    }

    #[test]
    fn test_new_operation_is_pending_with_created_event() {
        let operation = debit_operation();

        assert_eq!(operation.status, OperationStatus::Pending);
        assert_eq!(operation.provider, "wallet");

        let events = operation.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic.as_str(), "payment.operation.created");
        assert_eq!(events[0].aggregate_id, operation.id);
    }

    #[test]
    fn test_complete_records_transaction_ids() {
        let mut operation = debit_operation();
        operation.take_events();

        operation.complete("wallet-txn-1", "wallet-1", &clock());

        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(
            operation.provider_transaction_id.as_deref(),
            Some("wallet-txn-1")
        );

        let events = operation.pending_events();
        assert_eq!(events[0].topic.as_str(), "payment.operation.completed");
        let payload: OperationCompleted = events[0].payload().unwrap();
        assert_eq!(payload.payment_id, operation.payment_id);
        assert_eq!(payload.kind, "debit");
        assert_eq!(payload.provider_transaction_id, "wallet-txn-1");
    }

    #[test]
    fn test_fail_records_error_details() {
        let mut operation = debit_operation();
        operation.take_events();

        operation.fail("insufficient_funds", "not enough balance", &clock());

        assert_eq!(operation.status, OperationStatus::Failed);

        let events = operation.pending_events();
        assert_eq!(events[0].topic.as_str(), "payment.operation.failed");
        let payload: OperationFailed = events[0].payload().unwrap();
        assert_eq!(payload.error_code, "insufficient_funds");
        assert_eq!(payload.error_message, "not enough balance");
    }

    #[test]
    fn test_process_emits_processing_event() {
        let mut operation = debit_operation();
        operation.take_events();

        operation.process(&clock());

        assert_eq!(operation.status, OperationStatus::Processing);
        assert_eq!(
            operation.pending_events()[0].topic.as_str(),
            "payment.operation.processing"
        );
    }

    #[test]
    fn test_merge_metadata_copies_entries() {
        let mut operation = debit_operation();
        let mut metadata = OperationMetadata::new();
        metadata.insert("refund_id".into(), serde_json::json!("r-1"));

        operation.merge_metadata(&metadata);

        assert_eq!(
            operation.metadata.get("refund_id"),
            Some(&serde_json::json!("r-1"))
        );
    }
}
