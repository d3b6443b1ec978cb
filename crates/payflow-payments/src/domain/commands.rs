//! Commands and queries for the Payment Service.

use uuid::Uuid;

use payflow_core::money::Money;

use super::operation::{OperationKind, OperationMetadata, OperationStatus};
use super::payment_method::PaymentMethod;

/// Command to create a payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    /// The paying user.
    pub user_id: Uuid,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Method discriminator: `wallet`, `credit_card`, or `debit`.
    pub payment_method_type: String,
    /// Funding wallet, required for wallet payments.
    pub wallet_id: Option<Uuid>,
    /// Card token, required for card payments.
    pub card_token: Option<String>,
    /// Free-form description.
    pub description: String,
}

/// Command to start funding an initiated payment. Reacts to
/// `payment.created`.
#[derive(Debug, Clone)]
pub struct ProcessPaymentMethod {
    /// The payment to fund.
    pub payment_id: Uuid,
}

/// Outcome reported by the Wallet Service for a requested debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletDebitOutcome {
    /// The wallet was debited.
    Completed,
    /// The debit was rejected.
    Failed,
}

/// Command normalizing a wallet debit outcome into a payment operation.
/// Reacts to `wallet.debited` and `wallet.insufficient.funds`.
#[derive(Debug, Clone)]
pub struct ProcessWalletDebit {
    /// The paying payment.
    pub payment_id: Uuid,
    /// The wallet that reported.
    pub wallet_id: Uuid,
    /// The wallet ledger transaction, present on success.
    pub transaction_id: Option<Uuid>,
    /// Amount involved.
    pub amount: Money,
    /// How the debit ended.
    pub outcome: WalletDebitOutcome,
    /// Machine-readable code, required on failure.
    pub error_code: Option<String>,
    /// Human-readable message.
    pub error_message: Option<String>,
}

/// Command carrying a raw provider webhook.
#[derive(Debug, Clone)]
pub struct HandleExternalWebhook {
    /// Which provider sent the webhook.
    pub provider: String,
    /// Raw request body.
    pub payload: Vec<u8>,
    /// Signature header, when present.
    pub signature: Option<String>,
}

/// Command applying a normalized provider update. Reacts to
/// `external.provider.update`.
#[derive(Debug, Clone)]
pub struct ProcessExternalProviderUpdate {
    /// Reporting provider.
    pub provider: String,
    /// Provider-specific event type.
    pub event_type: String,
    /// Provider-assigned transaction id.
    pub transaction_id: String,
    /// Secondary external id.
    pub external_id: String,
    /// The payment this update refers to.
    pub payment_reference: String,
    /// Amount reported.
    pub amount: Money,
    /// Provider-specific status string.
    pub status: String,
    /// Machine-readable code, when failed.
    pub error_code: Option<String>,
    /// Human-readable message, when failed.
    pub error_message: Option<String>,
    /// Provider metadata merged onto the operation.
    pub metadata: OperationMetadata,
}

/// Command applying a terminal operation result to its payment. Reacts to
/// `payment.operation.completed` and `payment.operation.failed`.
#[derive(Debug, Clone)]
pub struct ProcessOperationResult {
    /// The reporting operation.
    pub operation_id: Uuid,
    /// The owning payment.
    pub payment_id: Uuid,
    /// Operation kind.
    pub kind: OperationKind,
    /// Operation status.
    pub status: OperationStatus,
    /// Amount involved.
    pub amount: Money,
    /// Provider-assigned transaction id.
    pub provider_transaction_id: Option<String>,
    /// Secondary external id.
    pub external_transaction_id: Option<String>,
    /// Machine-readable code.
    pub error_code: Option<String>,
    /// Human-readable message.
    pub error_message: Option<String>,
}

/// Command compensating a payment whose state no longer reflects its
/// operations. Reacts to `payment.inconsistent.state`.
#[derive(Debug, Clone)]
pub struct ProcessInconsistentPayment {
    /// The affected payment.
    pub payment_id: Uuid,
    /// What was detected.
    pub reason: String,
    /// Machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub error_message: String,
}

/// Command initiating a refund for a completed payment.
#[derive(Debug, Clone)]
pub struct RefundPayment {
    /// The payment to refund.
    pub payment_id: Uuid,
    /// Amount to refund. `None` or zero means a full refund.
    pub amount: Option<Money>,
    /// Why the refund was requested.
    pub reason: String,
    /// Who requested the refund.
    pub requested_by: Uuid,
}

/// Command routing an initiated refund to its funding source. Reacts to
/// `payment.refund.initiated`.
#[derive(Debug, Clone)]
pub struct ProcessRefund {
    /// The payment to refund.
    pub payment_id: Uuid,
    /// The refund attempt.
    pub refund_id: Uuid,
    /// Amount to refund.
    pub amount: Money,
    /// Why the refund was requested.
    pub reason: String,
    /// Who requested the refund.
    pub requested_by: Uuid,
    /// The original funding method.
    pub payment_method: PaymentMethod,
    /// The paying user.
    pub user_id: Uuid,
}

/// Query for one payment by id.
#[derive(Debug, Clone)]
pub struct GetPayment {
    /// The payment to load.
    pub payment_id: Uuid,
}
