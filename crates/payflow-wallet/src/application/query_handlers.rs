//! Query handlers for the Wallet Service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use payflow_core::error::DomainError;

use crate::domain::commands::GetWallet;
use crate::domain::repository::WalletRepository;

/// Read-only view of a wallet.
#[derive(Debug, Serialize)]
pub struct WalletView {
    /// The wallet identifier.
    pub wallet_id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// Balance in minor units.
    pub balance: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: String,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the wallet last changed.
    pub updated_at: DateTime<Utc>,
}

/// Retrieves one wallet by wallet id or user id. Exactly one selector must
/// be provided.
///
/// # Errors
///
/// `Validation` when zero or both selectors are set,
/// `AggregateNotFound` when no wallet matches.
pub async fn get_wallet(
    query: &GetWallet,
    wallets: &dyn WalletRepository,
) -> Result<WalletView, DomainError> {
    let wallet = match (query.wallet_id, query.user_id) {
        (Some(wallet_id), None) => wallets
            .find_by_id(wallet_id)
            .await?
            .ok_or(DomainError::AggregateNotFound(wallet_id))?,
        (None, Some(user_id)) => wallets
            .find_by_user_id(user_id)
            .await?
            .ok_or(DomainError::AggregateNotFound(user_id))?,
        _ => {
            return Err(DomainError::Validation(
                "exactly one of wallet_id or user_id is required".into(),
            ));
        }
    };

    Ok(WalletView {
        wallet_id: wallet.id,
        user_id: wallet.user_id,
        balance: wallet.balance.amount,
        currency: wallet.balance.currency.clone(),
        status: wallet.status.as_str().to_owned(),
        created_at: wallet.timestamps.created_at,
        updated_at: wallet.timestamps.updated_at,
    })
}
