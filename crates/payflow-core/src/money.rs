//! Monetary values in minor units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An amount of money expressed in the minor unit of an ISO-4217 currency
/// (e.g. cents for USD). Arithmetic across currencies is a domain error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
}

impl Money {
    /// Creates a new monetary value.
    #[must_use]
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Returns true when the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Returns true when the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Adds two monetary values of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CurrencyMismatch` when the currencies differ.
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, &*self.currency))
    }

    /// Subtracts `other` from `self`, requiring the same currency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CurrencyMismatch` when the currencies differ.
    pub fn subtract(&self, other: &Money) -> Result<Money, DomainError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, &*self.currency))
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
