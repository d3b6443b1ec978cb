//! Aggregate root and ledger entries for the Wallet Service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_core::money::Money;
use payflow_core::timestamps::Timestamps;
use payflow_core::topics;

use super::events::{
    InsufficientFundsDetected, WalletCredited, WalletDebited, WalletFrozen, WalletOpened,
    WalletUnfrozen,
};

/// Lifecycle status of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Debits and credits allowed.
    Active,
    /// Credits allowed, debits rejected.
    Frozen,
    /// No balance changes allowed.
    Closed,
}

impl WalletStatus {
    /// Returns the status as its persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Frozen => "frozen",
            WalletStatus::Closed => "closed",
        }
    }

    /// Parses the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown values.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "active" => Ok(WalletStatus::Active),
            "frozen" => Ok(WalletStatus::Frozen),
            "closed" => Ok(WalletStatus::Closed),
            other => Err(DomainError::Validation(format!(
                "unknown wallet status: {other}"
            ))),
        }
    }
}

/// Kind of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Balance decreased.
    Debit,
    /// Balance increased.
    Credit,
    /// Balance increased by a refund.
    Refund,
    /// Manual correction.
    Adjustment,
}

impl TransactionKind {
    /// Returns the kind as its persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::Credit => "credit",
            TransactionKind::Refund => "refund",
            TransactionKind::Adjustment => "adjustment",
        }
    }

    /// Parses the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown values.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "debit" => Ok(TransactionKind::Debit),
            "credit" => Ok(TransactionKind::Credit),
            "refund" => Ok(TransactionKind::Refund),
            "adjustment" => Ok(TransactionKind::Adjustment),
            other => Err(DomainError::Validation(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

/// User-facing direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Money came into the wallet.
    Income,
    /// Money left the wallet.
    Expense,
}

impl MovementKind {
    /// Returns the kind as its persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Income => "income",
            MovementKind::Expense => "expense",
        }
    }

    /// Parses the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown values.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "income" => Ok(MovementKind::Income),
            "expense" => Ok(MovementKind::Expense),
            other => Err(DomainError::Validation(format!(
                "unknown movement type: {other}"
            ))),
        }
    }

    /// The direction a revert of this movement takes.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            MovementKind::Income => MovementKind::Expense,
            MovementKind::Expense => MovementKind::Income,
        }
    }
}

/// An immutable ledger entry capturing one balance change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: Uuid,
    /// Owning wallet.
    pub wallet_id: Uuid,
    /// Direction of the change.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: Money,
    /// Balance before the change.
    pub balance_before: Money,
    /// Balance after the change.
    pub balance_after: Money,
    /// Free-form reference describing the change.
    pub reference: String,
    /// Payment that caused the change, when applicable.
    pub payment_id: Option<Uuid>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// The income/expense view of one balance-affecting transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    /// Movement identifier.
    pub id: Uuid,
    /// Owning wallet.
    pub wallet_id: Uuid,
    /// Direction from the user's perspective.
    pub kind: MovementKind,
    /// Amount moved.
    pub amount: Money,
    /// Ledger transaction backing this movement.
    pub transaction_id: Option<Uuid>,
    /// Free-form reference describing the movement.
    pub reference: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Records a movement backed by a ledger transaction.
    #[must_use]
    pub fn record(
        wallet_id: Uuid,
        kind: MovementKind,
        amount: Money,
        transaction_id: Uuid,
        reference: &str,
        description: Option<String>,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            kind,
            amount,
            transaction_id: Some(transaction_id),
            reference: reference.to_owned(),
            description,
            created_at: clock.now(),
        }
    }
}

/// The aggregate root owning a user's balance.
#[derive(Debug, Clone)]
pub struct Wallet {
    /// Wallet identifier.
    pub id: Uuid,
    /// Owning user. Unique per wallet.
    pub user_id: Uuid,
    /// Current balance. Never negative.
    pub balance: Money,
    /// Lifecycle status.
    pub status: WalletStatus,
    /// Creation/update instants.
    pub timestamps: Timestamps,
    /// Optimistic-locking version.
    pub version: i64,

    pending_events: Vec<Event>,
}

impl Wallet {
    /// Opens a wallet for a user with a zero balance.
    #[must_use]
    pub fn open(user_id: Uuid, currency: &str, clock: &dyn Clock) -> Self {
        let mut wallet = Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Money::new(0, currency),
            status: WalletStatus::Active,
            timestamps: Timestamps::new(clock),
            version: 1,
            pending_events: Vec::new(),
        };

        let event = Event::new(
            wallet.id,
            topics::WALLET_CREATED,
            &WalletOpened {
                wallet_id: wallet.id,
                user_id,
                currency: currency.to_owned(),
            },
            clock,
        );
        wallet.record(event);
        wallet
    }

    /// Rebuilds a wallet from its persisted state. Records no events.
    #[must_use]
    pub fn from_stored(
        id: Uuid,
        user_id: Uuid,
        balance: Money,
        status: WalletStatus,
        timestamps: Timestamps,
        version: i64,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            status,
            timestamps,
            version,
            pending_events: Vec::new(),
        }
    }

    /// Debits the wallet, appending a ledger transaction.
    ///
    /// An insufficient balance does not mutate the wallet but records a
    /// `wallet.insufficient.funds` event for the choreography to observe.
    ///
    /// # Errors
    ///
    /// `Guard` when the wallet is not active, `CurrencyMismatch` or
    /// `Validation` for bad amounts, `InsufficientFunds` when the balance
    /// cannot cover the debit.
    pub fn debit(
        &mut self,
        amount: Money,
        payment_id: Uuid,
        reference: &str,
        clock: &dyn Clock,
    ) -> Result<Transaction, DomainError> {
        if self.status != WalletStatus::Active {
            return Err(DomainError::Guard(format!(
                "wallet {} is not active",
                self.id
            )));
        }
        if amount.currency != self.balance.currency {
            return Err(DomainError::CurrencyMismatch {
                left: amount.currency,
                right: self.balance.currency.clone(),
            });
        }
        if !amount.is_positive() {
            return Err(DomainError::Validation(
                "debit amount must be positive".into(),
            ));
        }

        if self.balance.amount < amount.amount {
            let shortfall = Money::new(amount.amount - self.balance.amount, &*amount.currency);
            let event = Event::new(
                self.id,
                topics::WALLET_INSUFFICIENT_FUNDS,
                &InsufficientFundsDetected {
                    wallet_id: self.id,
                    user_id: self.user_id,
                    payment_id,
                    requested_amount: amount.clone(),
                    available_balance: self.balance.clone(),
                    shortfall,
                },
                clock,
            );
            self.record(event);
            return Err(DomainError::InsufficientFunds {
                requested: amount,
                available: self.balance.clone(),
            });
        }

        let balance_before = self.balance.clone();
        self.balance = balance_before.subtract(&amount)?;
        let transaction = Transaction {
            id: Uuid::new_v4(),
            wallet_id: self.id,
            kind: TransactionKind::Debit,
            amount: amount.clone(),
            balance_before: balance_before.clone(),
            balance_after: self.balance.clone(),
            reference: reference.to_owned(),
            payment_id: Some(payment_id),
            created_at: clock.now(),
        };

        self.timestamps.touch(clock);
        self.version += 1;

        let event = Event::new(
            self.id,
            topics::WALLET_DEBITED,
            &WalletDebited {
                wallet_id: self.id,
                user_id: self.user_id,
                payment_id,
                transaction_id: transaction.id,
                amount,
                balance_before,
                balance_after: self.balance.clone(),
                reference: reference.to_owned(),
            },
            clock,
        );
        self.record(event);

        Ok(transaction)
    }

    /// Credits the wallet, appending a ledger transaction. Forbidden only
    /// when the wallet is closed.
    ///
    /// # Errors
    ///
    /// `Guard` when the wallet is closed, `CurrencyMismatch` or
    /// `Validation` for bad amounts.
    pub fn credit(
        &mut self,
        amount: Money,
        reference: &str,
        payment_id: Option<Uuid>,
        clock: &dyn Clock,
    ) -> Result<Transaction, DomainError> {
        if self.status == WalletStatus::Closed {
            return Err(DomainError::Guard(format!("wallet {} is closed", self.id)));
        }
        if amount.currency != self.balance.currency {
            return Err(DomainError::CurrencyMismatch {
                left: amount.currency,
                right: self.balance.currency.clone(),
            });
        }
        if !amount.is_positive() {
            return Err(DomainError::Validation(
                "credit amount must be positive".into(),
            ));
        }

        let balance_before = self.balance.clone();
        self.balance = balance_before.add(&amount)?;
        let transaction = Transaction {
            id: Uuid::new_v4(),
            wallet_id: self.id,
            kind: TransactionKind::Credit,
            amount: amount.clone(),
            balance_before: balance_before.clone(),
            balance_after: self.balance.clone(),
            reference: reference.to_owned(),
            payment_id,
            created_at: clock.now(),
        };

        self.timestamps.touch(clock);
        self.version += 1;

        let mut event = Event::new(
            self.id,
            topics::WALLET_CREDITED,
            &WalletCredited {
                wallet_id: self.id,
                user_id: self.user_id,
                transaction_id: transaction.id,
                amount,
                balance_before,
                balance_after: self.balance.clone(),
                reference: reference.to_owned(),
            },
            clock,
        );
        if let Some(payment_id) = payment_id {
            event = event.with_metadata("payment_id", payment_id.to_string());
        }
        self.record(event);

        Ok(transaction)
    }

    /// Freezes the wallet. A closed wallet cannot be frozen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` when the wallet is closed.
    pub fn freeze(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.status == WalletStatus::Closed {
            return Err(DomainError::Guard(format!(
                "cannot freeze closed wallet {}",
                self.id
            )));
        }

        self.status = WalletStatus::Frozen;
        self.timestamps.touch(clock);
        self.version += 1;

        let event = Event::new(
            self.id,
            topics::WALLET_FROZEN,
            &WalletFrozen {
                wallet_id: self.id,
                user_id: self.user_id,
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    /// Unfreezes the wallet. Only a frozen wallet can be unfrozen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Guard` when the wallet is not frozen.
    pub fn unfreeze(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.status != WalletStatus::Frozen {
            return Err(DomainError::Guard(format!(
                "wallet {} is not frozen",
                self.id
            )));
        }

        self.status = WalletStatus::Active;
        self.timestamps.touch(clock);
        self.version += 1;

        let event = Event::new(
            self.id,
            topics::WALLET_UNFROZEN,
            &WalletUnfrozen {
                wallet_id: self.id,
                user_id: self.user_id,
            },
            clock,
        );
        self.record(event);
        Ok(())
    }

    /// Side-effect-free check whether a debit of `amount` would succeed.
    #[must_use]
    pub fn can_debit(&self, amount: &Money) -> bool {
        self.status == WalletStatus::Active
            && self.balance.currency == amount.currency
            && self.balance.amount >= amount.amount
    }

    fn record(&mut self, event: Event) {
        self.pending_events.push(event);
    }
}

impl AggregateRoot for Wallet {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn pending_events(&self) -> &[Event] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}
