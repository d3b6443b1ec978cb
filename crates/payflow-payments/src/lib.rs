//! Payflow Payments — the Payment Service's saga core.
//!
//! The payment aggregate owns the lifecycle state machine; payment
//! operations form the ledger of interactions with funding sources (wallet
//! debits, card charges, refunds, reversals) whose terminal events drive
//! the payment to its final state. Event handlers react to choreography
//! events; webhook adapters normalize external provider updates.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod testing;
pub mod webhooks;
