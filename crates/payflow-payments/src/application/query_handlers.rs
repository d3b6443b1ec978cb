//! Query handlers for the Payment Service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use payflow_core::error::DomainError;

use crate::domain::commands::GetPayment;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::repository::PaymentRepository;

/// Read-only view of a payment.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// How the payment is funded.
    pub payment_method: PaymentMethod,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// When the payment was created.
    pub created_at: DateTime<Utc>,
    /// When the payment last changed.
    pub updated_at: DateTime<Utc>,
}

/// Retrieves one payment by id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` when no payment matches.
pub async fn get_payment(
    query: &GetPayment,
    payments: &dyn PaymentRepository,
) -> Result<PaymentView, DomainError> {
    let payment = payments
        .find_by_id(query.payment_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(query.payment_id))?;

    Ok(PaymentView {
        payment_id: payment.id,
        user_id: payment.user_id,
        amount: payment.amount.amount,
        currency: payment.amount.currency.clone(),
        payment_method: payment.method.clone(),
        description: payment.description.clone(),
        status: payment.status.as_str().to_owned(),
        created_at: payment.timestamps.created_at,
        updated_at: payment.timestamps.updated_at,
    })
}
