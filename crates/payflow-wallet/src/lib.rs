//! Payflow Wallet — the Wallet Service's balance consistency layer.
//!
//! The wallet aggregate guards every balance change behind status, currency,
//! and sufficient-funds checks, and records an immutable transaction plus a
//! user-facing movement row for each change. Event handlers translate
//! choreography events into the movement use cases.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod testing;
