//! Integration tests for `PgPaymentRepository`.

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::error::DomainError;
use payflow_core::money::Money;
use payflow_payments::domain::aggregates::{Payment, PaymentStatus};
use payflow_payments::domain::payment_method::PaymentMethod;
use payflow_payments::domain::repository::PaymentRepository;
use payflow_payments::infrastructure::pg_payment_repository::PgPaymentRepository;
use payflow_test_support::FixedClock;

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

async fn seed_payment(repo: &PgPaymentRepository, method: PaymentMethod) -> Payment {
    let mut payment = Payment::create(
        Uuid::new_v4(),
        Money::new(5000, "USD"),
        method,
        "order 42",
        &clock(),
    )
    .unwrap();
    repo.save(&payment).await.unwrap();
    payment.take_events();
    payment
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_and_load_wallet_payment(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool);
    let wallet_id = Uuid::new_v4();
    let payment = seed_payment(&repo, PaymentMethod::Wallet { wallet_id }).await;

    let loaded = repo.find_by_id(payment.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, payment.id);
    assert_eq!(loaded.amount, Money::new(5000, "USD"));
    assert_eq!(loaded.method, PaymentMethod::Wallet { wallet_id });
    assert_eq!(loaded.status, PaymentStatus::Initiated);
    assert_eq!(loaded.version, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_card_method_round_trips_token(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool);
    let payment = seed_payment(
        &repo,
        PaymentMethod::CreditCard {
            card_token: "tok_42".to_owned(),
        },
    )
    .await;

    let loaded = repo.find_by_id(payment.id).await.unwrap().unwrap();

    assert_eq!(loaded.method.card_token(), Some("tok_42"));
    assert_eq!(loaded.method.type_str(), "credit_card");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_persists_transition_with_version_bump(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool);
    let seeded = seed_payment(
        &repo,
        PaymentMethod::Wallet {
            wallet_id: Uuid::new_v4(),
        },
    )
    .await;

    let mut payment = repo.find_by_id(seeded.id).await.unwrap().unwrap();
    payment.process(&clock()).unwrap();
    repo.save(&payment).await.unwrap();

    let loaded = repo.find_by_id(seeded.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, PaymentStatus::Processing);
    assert_eq!(loaded.version, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_update_surfaces_conflict(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool);
    let seeded = seed_payment(
        &repo,
        PaymentMethod::Wallet {
            wallet_id: Uuid::new_v4(),
        },
    )
    .await;

    let mut first = repo.find_by_id(seeded.id).await.unwrap().unwrap();
    let mut second = repo.find_by_id(seeded.id).await.unwrap().unwrap();

    first.process(&clock()).unwrap();
    repo.save(&first).await.unwrap();

    second.process(&clock()).unwrap();
    let result = repo.save(&second).await;

    assert!(matches!(
        result,
        Err(DomainError::ConcurrencyConflict { .. })
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_without_pending_events_is_a_no_op(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool);
    let seeded = seed_payment(
        &repo,
        PaymentMethod::Wallet {
            wallet_id: Uuid::new_v4(),
        },
    )
    .await;

    // A reload has no pending events; saving it must not conflict.
    let loaded = repo.find_by_id(seeded.id).await.unwrap().unwrap();
    repo.save(&loaded).await.unwrap();

    let unchanged = repo.find_by_id(seeded.id).await.unwrap().unwrap();
    assert_eq!(unchanged.version, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_soft_deleted_payment_is_invisible(pool: PgPool) {
    let repo = PgPaymentRepository::new(pool.clone());
    let seeded = seed_payment(
        &repo,
        PaymentMethod::Wallet {
            wallet_id: Uuid::new_v4(),
        },
    )
    .await;

    sqlx::query("UPDATE payments SET deleted_at = NOW() WHERE id = $1")
        .bind(seeded.id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(repo.find_by_id(seeded.id).await.unwrap().is_none());
}
