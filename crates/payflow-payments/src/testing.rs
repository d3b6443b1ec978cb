//! In-memory payment persistence for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::topics;

use crate::domain::aggregates::Payment;
use crate::domain::repository::PaymentRepository;

/// In-memory `PaymentRepository` mirroring the Postgres semantics: insert
/// on the creation event, version-checked update otherwise, no-op when
/// nothing is pending.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a payment directly, bypassing the save conventions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed_payment(&self, mut payment: Payment) {
        payment.take_events();
        self.payments.lock().unwrap().insert(payment.id, payment);
    }

    /// Returns a stored payment.
    ///
    /// # Panics
    ///
    /// Panics when the payment is unknown or the mutex is poisoned.
    #[must_use]
    pub fn payment(&self, id: Uuid) -> Payment {
        self.payments
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .expect("payment not seeded")
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.lock().unwrap().get(&id).cloned())
    }

    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let Some(first) = payment.pending_events().first() else {
            return Ok(());
        };

        let mut payments = self.payments.lock().unwrap();
        if first.topic.as_str() == topics::PAYMENT_CREATED {
            let mut copy = payment.clone();
            copy.take_events();
            payments.insert(payment.id, copy);
            return Ok(());
        }

        match payments.get(&payment.id) {
            Some(existing) if existing.version == payment.version - 1 => {
                let mut copy = payment.clone();
                copy.take_events();
                payments.insert(payment.id, copy);
                Ok(())
            }
            _ => Err(DomainError::ConcurrencyConflict {
                aggregate_id: payment.id,
                expected: payment.version - 1,
            }),
        }
    }
}
