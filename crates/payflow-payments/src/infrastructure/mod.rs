//! Infrastructure adapters for the Payment Service.

pub mod pg_payment_repository;
