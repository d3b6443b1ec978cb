//! HTTP routes for the Wallet Service.

pub mod health;
pub mod wallet;
