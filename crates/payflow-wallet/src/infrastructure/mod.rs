//! Infrastructure adapters for the Wallet Service.

pub mod pg_wallet_repository;
