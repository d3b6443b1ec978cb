//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use payflow_core::bus::Publisher;
use payflow_core::clock::Clock;
use payflow_wallet::domain::repository::{
    MovementRepository, TransactionRepository, WalletRepository,
};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wallet persistence.
    pub wallets: Arc<dyn WalletRepository>,
    /// Transaction ledger reads.
    pub transactions: Arc<dyn TransactionRepository>,
    /// Movement reads.
    pub movements: Arc<dyn MovementRepository>,
    /// Outbound event publisher.
    pub publisher: Arc<dyn Publisher>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Process start, reported by `/metrics`.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        wallets: Arc<dyn WalletRepository>,
        transactions: Arc<dyn TransactionRepository>,
        movements: Arc<dyn MovementRepository>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            wallets,
            transactions,
            movements,
            publisher,
            clock,
            started_at,
        }
    }
}
