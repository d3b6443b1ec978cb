//! Repository trait for the Payment Service.

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::error::DomainError;

use super::aggregates::Payment;

/// Persistence for the payment aggregate.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Loads a payment by id, skipping soft-deleted rows.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError>;

    /// Persists the aggregate. The first pending event being
    /// `payment.created` selects INSERT; any other pending event selects an
    /// optimistic UPDATE guarded by the previous version. With no pending
    /// events there is nothing to persist and the call is a no-op.
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;
}
