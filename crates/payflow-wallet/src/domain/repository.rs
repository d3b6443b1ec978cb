//! Repository traits for the Wallet Service.

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::error::DomainError;

use super::aggregates::{Movement, Transaction, Wallet};

/// Persistence for the wallet aggregate and its ledger unit of work.
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Loads a wallet by id, skipping soft-deleted rows.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, DomainError>;

    /// Loads a wallet by its owning user.
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, DomainError>;

    /// Persists the aggregate alone. The first pending event being
    /// `wallet.created` selects INSERT; anything else is an optimistic
    /// UPDATE guarded by the previous version.
    async fn save(&self, wallet: &Wallet) -> Result<(), DomainError>;

    /// Persists a balance change as one unit of work: the optimistic wallet
    /// update plus the transaction and movement rows.
    async fn save_with_entries(
        &self,
        wallet: &Wallet,
        transaction: &Transaction,
        movement: &Movement,
    ) -> Result<(), DomainError>;
}

/// Read access to the immutable transaction ledger.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Loads one transaction by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DomainError>;

    /// Lists a wallet's transactions, newest first.
    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DomainError>;

    /// Lists transactions caused by a payment.
    async fn find_by_payment_id(&self, payment_id: Uuid) -> Result<Vec<Transaction>, DomainError>;
}

/// Read access to the movement view.
#[async_trait]
pub trait MovementRepository: Send + Sync {
    /// Loads one movement by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Movement>, DomainError>;

    /// Lists a wallet's movements, newest first.
    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Movement>, DomainError>;
}
