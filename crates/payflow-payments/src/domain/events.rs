//! Domain event payloads for the Payment Service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use payflow_core::money::Money;

use super::operation::OperationMetadata;
use super::payment_method::PaymentMethod;

/// Emitted when a payment is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreated {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount to move.
    pub amount: Money,
    /// How the payment is funded.
    pub payment_method: PaymentMethod,
    /// Free-form description.
    pub description: String,
}

/// Emitted when funding starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessing {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
}

/// Emitted when the payment completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompleted {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount moved.
    pub amount: Money,
    /// Transaction id at the funding source.
    pub provider_transaction_id: String,
    /// Secondary external id.
    pub external_transaction_id: String,
    /// When the payment completed.
    pub completed_at: DateTime<Utc>,
}

/// Emitted when the payment fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount that failed to move.
    pub amount: Money,
    /// Human-readable reason.
    pub reason: String,
    /// Machine-readable code.
    pub error_code: String,
    /// When the payment failed.
    pub failed_at: DateTime<Utc>,
}

/// Emitted when the payment is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCancelled {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// When the payment was cancelled.
    pub cancelled_at: DateTime<Utc>,
}

/// Emitted when a payment operation is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCreated {
    /// The operation identifier.
    pub operation_id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
    /// Operation kind, e.g. `debit`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount involved.
    pub amount: Money,
    /// Which provider settles the operation.
    pub provider: String,
}

/// Emitted when an operation starts processing at its provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationProcessing {
    /// The operation identifier.
    pub operation_id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
}

/// Emitted when an operation completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCompleted {
    /// The operation identifier.
    pub operation_id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
    /// Operation kind, e.g. `debit`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount involved.
    pub amount: Money,
    /// Which provider settled the operation.
    pub provider: String,
    /// Provider-assigned transaction id.
    pub provider_transaction_id: String,
    /// Secondary external id.
    pub external_transaction_id: String,
    /// When the operation completed.
    pub completed_at: DateTime<Utc>,
}

/// Emitted when an operation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationFailed {
    /// The operation identifier.
    pub operation_id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
    /// Operation kind, e.g. `debit`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount involved.
    pub amount: Money,
    /// Which provider reported the failure.
    pub provider: String,
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
    /// When the operation failed.
    pub failed_at: DateTime<Utc>,
}

/// Normalized external provider update, published after webhook ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalProviderUpdate {
    /// Reporting provider.
    pub provider: String,
    /// Provider-specific event type.
    pub event_type: String,
    /// Provider-assigned transaction id.
    pub transaction_id: String,
    /// Secondary external id.
    pub external_id: String,
    /// The payment this update refers to, as sent by the provider.
    pub payment_reference: String,
    /// Amount reported.
    pub amount: Money,
    /// Provider-specific status string.
    pub status: String,
    /// Machine-readable code, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable message, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider metadata.
    #[serde(default)]
    pub metadata: OperationMetadata,
    /// When the provider produced the update.
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a refund is requested for a completed payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundInitiated {
    /// The payment to refund.
    pub payment_id: Uuid,
    /// Fresh id for this refund attempt.
    pub refund_id: Uuid,
    /// Amount to refund.
    pub amount: Money,
    /// Why the refund was requested.
    pub reason: String,
    /// Who requested the refund.
    pub requested_by: Uuid,
    /// The original funding method, so the reaction can route.
    pub payment_method: PaymentMethod,
    /// The paying user.
    pub user_id: Uuid,
}

/// Emitted when a refund operation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundFailed {
    /// The payment whose refund failed.
    pub payment_id: Uuid,
    /// Amount that failed to refund.
    pub refund_amount: Money,
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
}

/// Emitted when payment state no longer reflects its operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInconsistentState {
    /// The affected payment.
    pub payment_id: Uuid,
    /// What was detected.
    pub reason: String,
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
}

/// Audit event opening an inconsistency compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InconsistentOperationStarted {
    /// The affected payment.
    pub payment_id: Uuid,
    /// Payment status at the time compensation started.
    pub payment_status: String,
    /// What was detected.
    pub reason: String,
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
}

/// Audit event closing an inconsistency compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InconsistentOperationProcessed {
    /// The affected payment.
    pub payment_id: Uuid,
    /// What was detected.
    pub reason: String,
    /// The compensation applied, e.g. `full_refund_initiated`.
    pub action: String,
}

/// Published towards the Wallet Service to take funds for a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDebitRequested {
    /// The paying payment.
    pub payment_id: Uuid,
    /// The funding wallet.
    pub wallet_id: Uuid,
    /// The paying user.
    pub user_id: Uuid,
    /// Amount to debit.
    pub amount: Money,
    /// Reference recorded on the wallet ledger.
    pub reference: String,
}

/// Published towards the Wallet Service to return funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCreditRequested {
    /// The payment being compensated or refunded.
    pub payment_id: Uuid,
    /// The wallet to credit.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// Amount to credit.
    pub amount: Money,
    /// Reference recorded on the wallet ledger.
    pub reference: String,
    /// Why the credit was requested.
    pub reason: String,
    /// The refund this credit belongs to, when refund-driven.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<Uuid>,
}
