//! In-memory wallet persistence for tests.
//!
//! Mirrors the Postgres repositories' semantics, including the
//! insert-on-creation-event convention and version-checked updates, so use
//! cases can be exercised without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::topics;

use crate::domain::aggregates::{Movement, Transaction, Wallet, WalletStatus};
use crate::domain::repository::{MovementRepository, TransactionRepository, WalletRepository};

/// In-memory store backing all three wallet repositories.
#[derive(Default)]
pub struct InMemoryWalletStore {
    wallets: Mutex<HashMap<Uuid, Wallet>>,
    transactions: Mutex<Vec<Transaction>>,
    movements: Mutex<Vec<Movement>>,
}

impl InMemoryWalletStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a wallet directly, bypassing the save conventions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed_wallet(&self, mut wallet: Wallet) {
        wallet.take_events();
        self.wallets.lock().unwrap().insert(wallet.id, wallet);
    }

    /// Returns a stored wallet.
    ///
    /// # Panics
    ///
    /// Panics when the wallet is unknown or the mutex is poisoned.
    #[must_use]
    pub fn wallet(&self, id: Uuid) -> Wallet {
        self.wallets
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .expect("wallet not seeded")
    }

    /// Overrides a stored wallet's status.
    ///
    /// # Panics
    ///
    /// Panics when the wallet is unknown or the mutex is poisoned.
    pub fn set_status(&self, id: Uuid, status: WalletStatus) {
        self.wallets
            .lock()
            .unwrap()
            .get_mut(&id)
            .expect("wallet not seeded")
            .status = status;
    }

    /// Snapshot of all transactions in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    /// Snapshot of all movements in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn movements(&self) -> Vec<Movement> {
        self.movements.lock().unwrap().clone()
    }

    fn store_update(&self, wallet: &Wallet) -> Result<(), DomainError> {
        let mut wallets = self.wallets.lock().unwrap();
        let stored = wallets.get(&wallet.id);
        match stored {
            Some(existing) if existing.version == wallet.version - 1 => {
                let mut copy = wallet.clone();
                copy.take_events();
                wallets.insert(wallet.id, copy);
                Ok(())
            }
            _ => Err(DomainError::ConcurrencyConflict {
                aggregate_id: wallet.id,
                expected: wallet.version - 1,
            }),
        }
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, DomainError> {
        Ok(self.wallets.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, DomainError> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .values()
            .find(|w| w.user_id == user_id)
            .cloned())
    }

    async fn save(&self, wallet: &Wallet) -> Result<(), DomainError> {
        let is_creation = wallet
            .pending_events()
            .first()
            .is_some_and(|e| e.topic.as_str() == topics::WALLET_CREATED);
        if is_creation {
            let mut copy = wallet.clone();
            copy.take_events();
            self.wallets.lock().unwrap().insert(wallet.id, copy);
            return Ok(());
        }
        self.store_update(wallet)
    }

    async fn save_with_entries(
        &self,
        wallet: &Wallet,
        transaction: &Transaction,
        movement: &Movement,
    ) -> Result<(), DomainError> {
        self.store_update(wallet)?;
        self.transactions.lock().unwrap().push(transaction.clone());
        self.movements.lock().unwrap().push(movement.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryWalletStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DomainError> {
        let transactions = self.transactions.lock().unwrap();
        Ok(transactions
            .iter()
            .rev()
            .filter(|t| t.wallet_id == wallet_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_by_payment_id(&self, payment_id: Uuid) -> Result<Vec<Transaction>, DomainError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.payment_id == Some(payment_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MovementRepository for InMemoryWalletStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Movement>, DomainError> {
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Movement>, DomainError> {
        let movements = self.movements.lock().unwrap();
        Ok(movements
            .iter()
            .rev()
            .filter(|m| m.wallet_id == wallet_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
