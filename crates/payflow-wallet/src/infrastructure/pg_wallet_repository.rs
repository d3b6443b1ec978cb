//! `PostgreSQL` implementations of the wallet repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::money::Money;
use payflow_core::timestamps::Timestamps;
use payflow_core::topics;

use crate::domain::aggregates::{
    Movement, MovementKind, Transaction, TransactionKind, Wallet, WalletStatus,
};
use crate::domain::repository::{MovementRepository, TransactionRepository, WalletRepository};

fn infra(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("wallet store: {e}"))
}

#[derive(Debug, FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

impl WalletRow {
    fn into_domain(self) -> Result<Wallet, DomainError> {
        Ok(Wallet::from_stored(
            self.id,
            self.user_id,
            Money::new(self.balance, &*self.currency),
            WalletStatus::parse(&self.status)?,
            Timestamps {
                created_at: self.created_at,
                updated_at: self.updated_at,
                deleted_at: self.deleted_at,
            },
            self.version,
        ))
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    wallet_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    amount: i64,
    currency: String,
    balance_before: i64,
    balance_after: i64,
    reference: String,
    payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> Result<Transaction, DomainError> {
        Ok(Transaction {
            id: self.id,
            wallet_id: self.wallet_id,
            kind: TransactionKind::parse(&self.kind)?,
            amount: Money::new(self.amount, &*self.currency),
            balance_before: Money::new(self.balance_before, &*self.currency),
            balance_after: Money::new(self.balance_after, &*self.currency),
            reference: self.reference,
            payment_id: self.payment_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    wallet_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    amount: i64,
    currency: String,
    transaction_id: Option<Uuid>,
    reference: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_domain(self) -> Result<Movement, DomainError> {
        Ok(Movement {
            id: self.id,
            wallet_id: self.wallet_id,
            kind: MovementKind::parse(&self.kind)?,
            amount: Money::new(self.amount, &*self.currency),
            transaction_id: self.transaction_id,
            reference: self.reference,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL-backed wallet repository.
#[derive(Debug, Clone)]
pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    /// Creates a new `PgWalletRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, wallet: &Wallet) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO wallets (
                id, user_id, balance, currency, status,
                created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(wallet.id)
        .bind(wallet.user_id)
        .bind(wallet.balance.amount)
        .bind(&wallet.balance.currency)
        .bind(wallet.status.as_str())
        .bind(wallet.timestamps.created_at)
        .bind(wallet.timestamps.updated_at)
        .bind(wallet.version)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn update<'e, E>(&self, executor: E, wallet: &Wallet) -> Result<(), DomainError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r"
            UPDATE wallets
               SET balance = $1, status = $2, updated_at = $3, version = $4
             WHERE id = $5 AND version = $6 AND deleted_at IS NULL",
        )
        .bind(wallet.balance.amount)
        .bind(wallet.status.as_str())
        .bind(wallet.timestamps.updated_at)
        .bind(wallet.version)
        .bind(wallet.id)
        .bind(wallet.version - 1)
        .execute(executor)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: wallet.id,
                expected: wallet.version - 1,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, DomainError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r"
            SELECT id, user_id, balance, currency, status,
                   created_at, updated_at, deleted_at, version
              FROM wallets
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(WalletRow::into_domain).transpose()
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, DomainError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r"
            SELECT id, user_id, balance, currency, status,
                   created_at, updated_at, deleted_at, version
              FROM wallets
             WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(WalletRow::into_domain).transpose()
    }

    async fn save(&self, wallet: &Wallet) -> Result<(), DomainError> {
        let is_creation = wallet
            .pending_events()
            .first()
            .is_some_and(|e| e.topic.as_str() == topics::WALLET_CREATED);
        if is_creation {
            self.insert(wallet).await
        } else {
            self.update(&self.pool, wallet).await
        }
    }

    async fn save_with_entries(
        &self,
        wallet: &Wallet,
        transaction: &Transaction,
        movement: &Movement,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        self.update(&mut *tx, wallet).await?;

        sqlx::query(
            r"
            INSERT INTO wallet_transactions (
                id, wallet_id, type, amount, currency, balance_before,
                balance_after, reference, payment_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(transaction.id)
        .bind(transaction.wallet_id)
        .bind(transaction.kind.as_str())
        .bind(transaction.amount.amount)
        .bind(&transaction.amount.currency)
        .bind(transaction.balance_before.amount)
        .bind(transaction.balance_after.amount)
        .bind(&transaction.reference)
        .bind(transaction.payment_id)
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;

        sqlx::query(
            r"
            INSERT INTO wallet_movements (
                id, wallet_id, type, amount, currency, transaction_id,
                reference, description, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(movement.id)
        .bind(movement.wallet_id)
        .bind(movement.kind.as_str())
        .bind(movement.amount.amount)
        .bind(&movement.amount.currency)
        .bind(movement.transaction_id)
        .bind(&movement.reference)
        .bind(&movement.description)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;

        tx.commit().await.map_err(infra)
    }
}

/// PostgreSQL-backed transaction ledger reads.
#[derive(Debug, Clone)]
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    /// Creates a new `PgTransactionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r"
            SELECT id, wallet_id, type, amount, currency, balance_before,
                   balance_after, reference, payment_id, created_at
              FROM wallet_transactions
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(TransactionRow::into_domain).transpose()
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r"
            SELECT id, wallet_id, type, amount, currency, balance_before,
                   balance_after, reference, payment_id, created_at
              FROM wallet_transactions
             WHERE wallet_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(wallet_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn find_by_payment_id(&self, payment_id: Uuid) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r"
            SELECT id, wallet_id, type, amount, currency, balance_before,
                   balance_after, reference, payment_id, created_at
              FROM wallet_transactions
             WHERE payment_id = $1
             ORDER BY created_at DESC",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// PostgreSQL-backed movement reads.
#[derive(Debug, Clone)]
pub struct PgMovementRepository {
    pool: PgPool,
}

impl PgMovementRepository {
    /// Creates a new `PgMovementRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovementRepository for PgMovementRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Movement>, DomainError> {
        let row: Option<MovementRow> = sqlx::query_as(
            r"
            SELECT id, wallet_id, type, amount, currency, transaction_id,
                   reference, description, created_at
              FROM wallet_movements
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(MovementRow::into_domain).transpose()
    }

    async fn find_by_wallet_id(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Movement>, DomainError> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            r"
            SELECT id, wallet_id, type, amount, currency, transaction_id,
                   reference, description, created_at
              FROM wallet_movements
             WHERE wallet_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(wallet_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.into_iter().map(MovementRow::into_domain).collect()
    }
}
