//! HTTP routes for the Payment Service.

pub mod health;
pub mod payments;
pub mod webhooks;
