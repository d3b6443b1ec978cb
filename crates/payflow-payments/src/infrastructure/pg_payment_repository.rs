//! `PostgreSQL` implementation of the `PaymentRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::money::Money;
use payflow_core::timestamps::Timestamps;
use payflow_core::topics;

use crate::domain::aggregates::{Payment, PaymentStatus};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

fn infra(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("payment store: {e}"))
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    amount: i64,
    currency: String,
    payment_method_type: String,
    payment_method_wallet_id: Option<Uuid>,
    payment_method_card_token: Option<String>,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, DomainError> {
        let method = PaymentMethod::from_request(
            &self.payment_method_type,
            self.payment_method_wallet_id,
            self.payment_method_card_token.as_deref(),
        )?;
        Ok(Payment::from_stored(
            self.id,
            self.user_id,
            Money::new(self.amount, &*self.currency),
            method,
            self.description,
            PaymentStatus::parse(&self.status)?,
            Timestamps {
                created_at: self.created_at,
                updated_at: self.updated_at,
                deleted_at: self.deleted_at,
            },
            self.version,
        ))
    }
}

/// PostgreSQL-backed payment repository.
#[derive(Debug, Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Creates a new `PgPaymentRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO payments (
                id, user_id, amount, currency, payment_method_type,
                payment_method_wallet_id, payment_method_card_token,
                description, status, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.amount.amount)
        .bind(&payment.amount.currency)
        .bind(payment.method.type_str())
        .bind(payment.method.wallet_id())
        .bind(payment.method.card_token())
        .bind(&payment.description)
        .bind(payment.status.as_str())
        .bind(payment.timestamps.created_at)
        .bind(payment.timestamps.updated_at)
        .bind(payment.version)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r"
            UPDATE payments
               SET status = $1, updated_at = $2, version = $3
             WHERE id = $4 AND version = $5 AND deleted_at IS NULL",
        )
        .bind(payment.status.as_str())
        .bind(payment.timestamps.updated_at)
        .bind(payment.version)
        .bind(payment.id)
        .bind(payment.version - 1)
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: payment.id,
                expected: payment.version - 1,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r"
            SELECT id, user_id, amount, currency, payment_method_type,
                   payment_method_wallet_id, payment_method_card_token,
                   description, status, created_at, updated_at, deleted_at,
                   version
              FROM payments
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.map(PaymentRow::into_domain).transpose()
    }

    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let Some(first) = payment.pending_events().first() else {
            // Nothing changed; nothing to persist.
            return Ok(());
        };
        if first.topic.as_str() == topics::PAYMENT_CREATED {
            self.insert(payment).await
        } else {
            self.update(payment).await
        }
    }
}
