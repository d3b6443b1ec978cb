//! Property tests for the wallet ledger.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::money::Money;
use payflow_test_support::FixedClock;
use payflow_wallet::domain::aggregates::{TransactionKind, Wallet};

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

proptest! {
    /// For any sequence of credits and debits respecting preconditions, the
    /// balance reconstructed from the transaction ledger equals the stored
    /// balance, every entry is internally consistent, and the version grows
    /// by exactly one per applied entry.
    #[test]
    fn test_ledger_reconstruction_matches_balance(
        operations in prop::collection::vec((any::<bool>(), 1i64..10_000), 1..50)
    ) {
        let fixed = clock();
        let mut wallet = Wallet::open(Uuid::new_v4(), "USD", &fixed);
        wallet.take_events();

        let mut ledger = Vec::new();
        for (is_credit, amount) in operations {
            let money = Money::new(amount, "USD");
            if is_credit {
                ledger.push(wallet.credit(money, "prop", None, &fixed).unwrap());
            } else if wallet.can_debit(&money) {
                ledger.push(wallet.debit(money, Uuid::new_v4(), "prop", &fixed).unwrap());
            }
        }

        // Balance never negative.
        prop_assert!(wallet.balance.amount >= 0);

        // Per-entry consistency and whole-ledger reconstruction.
        let mut reconstructed = 0i64;
        for entry in &ledger {
            let signed = match entry.kind {
                TransactionKind::Credit | TransactionKind::Refund => entry.amount.amount,
                TransactionKind::Debit | TransactionKind::Adjustment => -entry.amount.amount,
            };
            prop_assert_eq!(
                entry.balance_after.amount,
                entry.balance_before.amount + signed
            );
            reconstructed += signed;
        }
        prop_assert_eq!(reconstructed, wallet.balance.amount);

        // Version monotonicity: one bump per applied entry.
        prop_assert_eq!(wallet.version, 1 + i64::try_from(ledger.len()).unwrap());
    }
}
