//! Application layer for the Wallet Service.
//!
//! Command handlers orchestrate domain logic: load the wallet, apply the
//! balance change, persist the unit of work, publish the pending events.
//! The dispatcher translates inbound choreography events into commands.

pub mod command_handlers;
pub mod dispatch;
pub mod query_handlers;
