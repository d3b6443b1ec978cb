//! Application layer for the Payment Service.
//!
//! One handler per choreography step: each validates its command, loads
//! the payment, applies the transition or spawns the next operation, saves,
//! and publishes. The dispatcher maps inbound event topics to handlers.

pub mod create_payment;
pub mod dispatch;
pub mod external_updates;
pub mod operation_results;
pub mod process_payment_method;
pub mod process_wallet_debit;
pub mod query_handlers;
pub mod refunds;
