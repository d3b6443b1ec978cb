//! Event topic constants for the payment choreography.

// Payment lifecycle.
pub const PAYMENT_CREATED: &str = "payment.created";
pub const PAYMENT_PROCESSING: &str = "payment.processing";
pub const PAYMENT_COMPLETED: &str = "payment.completed";
pub const PAYMENT_FAILED: &str = "payment.failed";
pub const PAYMENT_CANCELLED: &str = "payment.cancelled";
pub const PAYMENT_REFUND_INITIATED: &str = "payment.refund.initiated";
pub const PAYMENT_REFUND_COMPLETED: &str = "payment.refund.completed";
pub const PAYMENT_REFUND_FAILED: &str = "payment.refund.failed";
pub const PAYMENT_INCONSISTENT_STATE: &str = "payment.inconsistent.state";
pub const PAYMENT_INCONSISTENT_OPERATION_STARTED: &str = "payment.inconsistent.operation.started";
pub const PAYMENT_INCONSISTENT_OPERATION_PROCESSED: &str =
    "payment.inconsistent.operation.processed";

// Payment operation ledger.
pub const PAYMENT_OPERATION_CREATED: &str = "payment.operation.created";
pub const PAYMENT_OPERATION_PROCESSING: &str = "payment.operation.processing";
pub const PAYMENT_OPERATION_COMPLETED: &str = "payment.operation.completed";
pub const PAYMENT_OPERATION_FAILED: &str = "payment.operation.failed";

// External providers.
pub const EXTERNAL_PROVIDER_UPDATE: &str = "external.provider.update";

// Wallet.
pub const WALLET_CREATED: &str = "wallet.created";
pub const WALLET_DEBIT_REQUESTED: &str = "wallet.debit.requested";
pub const WALLET_CREDIT_REQUESTED: &str = "wallet.credit.requested";
pub const WALLET_DEBITED: &str = "wallet.debited";
pub const WALLET_CREDITED: &str = "wallet.credited";
pub const WALLET_MOVEMENT_CREATED: &str = "wallet.movement.created";
pub const WALLET_MOVEMENT_REVERTED: &str = "wallet.movement.reverted";
pub const WALLET_MOVEMENT_CREATION_REQUESTED: &str = "wallet.movement.creation.requested";
pub const WALLET_MOVEMENT_REVERT_REQUESTED: &str = "wallet.movement.revert.requested";
pub const WALLET_INSUFFICIENT_FUNDS: &str = "wallet.insufficient.funds";
pub const WALLET_FROZEN: &str = "wallet.frozen";
pub const WALLET_UNFROZEN: &str = "wallet.unfrozen";
