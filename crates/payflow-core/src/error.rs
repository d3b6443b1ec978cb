//! Domain error taxonomy.

use thiserror::Error;
use uuid::Uuid;

use crate::money::Money;

/// Top-level domain error type shared by both services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found. From an event handler this is treated as
    /// a stale reference and acknowledged.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict: an update matched zero rows because
    /// another writer advanced the version first.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the writer expected to replace.
        expected: i64,
    },

    /// Malformed or incomplete input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A state-machine guard rejected the transition. Handlers treat this
    /// as an idempotent no-op.
    #[error("invalid state transition: {0}")]
    Guard(String),

    /// A debit exceeded the available balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount the debit asked for.
        requested: Money,
        /// Balance at the time of the attempt.
        available: Money,
    },

    /// Arithmetic or comparison across two different currencies.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency on the left-hand side.
        left: String,
        /// Currency on the right-hand side.
        right: String,
    },

    /// A provider, payment method, or status outside the supported set.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A database, broker, or serialization failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// True for error kinds an event dispatcher acknowledges instead of
    /// retrying: stale references, guard rejections, and insufficient funds
    /// (the choreography observes the emitted event instead).
    #[must_use]
    pub fn acks_from_handler(&self) -> bool {
        matches!(
            self,
            DomainError::AggregateNotFound(_)
                | DomainError::Guard(_)
                | DomainError::InsufficientFunds { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_ack_policy() {
        assert!(DomainError::AggregateNotFound(Uuid::new_v4()).acks_from_handler());
        assert!(DomainError::Guard("already processing".into()).acks_from_handler());
        assert!(DomainError::InsufficientFunds {
            requested: Money::new(5000, "USD"),
            available: Money::new(1000, "USD"),
        }
        .acks_from_handler());

        assert!(!DomainError::Validation("bad input".into()).acks_from_handler());
        assert!(!DomainError::ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            expected: 2,
        }
        .acks_from_handler());
        assert!(!DomainError::Infrastructure("db down".into()).acks_from_handler());
    }
}
