//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_payments::domain::repository::PaymentRepository;
use payflow_payments::webhooks::SignatureVerifier;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Payment persistence.
    pub payments: Arc<dyn PaymentRepository>,
    /// Outbound event publisher.
    pub publisher: Arc<dyn Publisher>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Webhook signature policy.
    pub verifier: Arc<dyn SignatureVerifier>,
    /// Process start, reported by `/metrics`.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            payments,
            publisher,
            clock,
            verifier,
            started_at,
        }
    }
}
