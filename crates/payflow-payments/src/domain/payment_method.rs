//! Payment method variants.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use payflow_core::error::DomainError;

/// How a payment is funded. The payload always matches the variant, so
/// consumers match instead of null-checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Funded from the user's wallet balance.
    Wallet {
        /// The funding wallet.
        wallet_id: Uuid,
    },
    /// Charged to a tokenized credit card via an external provider.
    CreditCard {
        /// Provider-issued card token.
        card_token: String,
    },
    /// Charged to a tokenized debit card via an external provider.
    Debit {
        /// Provider-issued card token.
        card_token: String,
    },
}

impl PaymentMethod {
    /// Builds the variant from a request's discriminator and optional
    /// fields, validating that the fields required by the variant are
    /// present.
    ///
    /// # Errors
    ///
    /// `Validation` for missing variant fields, `Unsupported` for unknown
    /// discriminators.
    pub fn from_request(
        method_type: &str,
        wallet_id: Option<Uuid>,
        card_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        match method_type {
            "wallet" => wallet_id
                .map(|wallet_id| PaymentMethod::Wallet { wallet_id })
                .ok_or_else(|| {
                    DomainError::Validation("wallet id is required for wallet payments".into())
                }),
            "credit_card" => match card_token {
                Some(token) if !token.is_empty() => Ok(PaymentMethod::CreditCard {
                    card_token: token.to_owned(),
                }),
                _ => Err(DomainError::Validation(
                    "card token is required for card payments".into(),
                )),
            },
            "debit" => match card_token {
                Some(token) if !token.is_empty() => Ok(PaymentMethod::Debit {
                    card_token: token.to_owned(),
                }),
                _ => Err(DomainError::Validation(
                    "card token is required for card payments".into(),
                )),
            },
            other => Err(DomainError::Unsupported(format!(
                "unknown payment method type: {other}"
            ))),
        }
    }

    /// Returns the discriminator string.
    #[must_use]
    pub fn type_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet { .. } => "wallet",
            PaymentMethod::CreditCard { .. } => "credit_card",
            PaymentMethod::Debit { .. } => "debit",
        }
    }

    /// Returns the funding wallet, when wallet-funded.
    #[must_use]
    pub fn wallet_id(&self) -> Option<Uuid> {
        match self {
            PaymentMethod::Wallet { wallet_id } => Some(*wallet_id),
            _ => None,
        }
    }

    /// Returns the card token, when card-funded.
    #[must_use]
    pub fn card_token(&self) -> Option<&str> {
        match self {
            PaymentMethod::CreditCard { card_token } | PaymentMethod::Debit { card_token } => {
                Some(card_token)
            }
            PaymentMethod::Wallet { .. } => None,
        }
    }

    /// True when the method is settled by an external provider.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            PaymentMethod::CreditCard { .. } | PaymentMethod::Debit { .. }
        )
    }
}
