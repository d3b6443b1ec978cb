//! End-to-end choreography tests: both services' dispatchers wired over
//! the in-memory broker against one Postgres database.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use payflow_core::aggregate::AggregateRoot;
use payflow_core::bus::{Publisher, Subscriber};
use payflow_core::clock::SystemClock;
use payflow_core::money::Money;
use payflow_event_store::publisher::StoringPublisher;
use payflow_event_store::stream::{EventStream, MemoryEventStream};
use payflow_payments::application::dispatch::PaymentEventDispatcher;
use payflow_payments::domain::aggregates::PaymentStatus;
use payflow_payments::domain::repository::PaymentRepository;
use payflow_payments::infrastructure::pg_payment_repository::PgPaymentRepository;
use payflow_payments::webhooks::PermissiveVerifier;
use payflow_payments_api::routes;
use payflow_payments_api::state::AppState;
use payflow_transport::memory::InMemoryBroker;
use payflow_transport::publisher::FanoutPublisher;
use payflow_transport::subscriber::{QueueSubscriber, SubscriberOptions};
use payflow_wallet::application::dispatch::WalletEventDispatcher;
use payflow_wallet::domain::aggregates::Wallet;
use payflow_wallet::domain::repository::WalletRepository;
use payflow_wallet::infrastructure::pg_wallet_repository::{
    PgMovementRepository, PgTransactionRepository, PgWalletRepository,
};

struct Services {
    payments: Arc<PgPaymentRepository>,
    wallets: Arc<PgWalletRepository>,
    publisher: Arc<dyn Publisher>,
    /// Records every published envelope for topic assertions.
    probe: Arc<MemoryEventStream>,
    payments_subscriber: Arc<QueueSubscriber>,
    wallet_subscriber: Arc<QueueSubscriber>,
}

fn fast_options(name: &str) -> SubscriberOptions {
    SubscriberOptions {
        name: name.to_owned(),
        readers: 1,
        workers: 4,
        cleaners: 1,
        wait_time: Duration::from_millis(40),
        visibility_timeout: Duration::from_millis(500),
        sleep_after_empty_receive: Duration::from_millis(20),
        sleep_after_error: Duration::from_millis(20),
        ..SubscriberOptions::default()
    }
}

/// Wires both services' dispatchers onto one broker and starts their
/// subscriber pipelines.
async fn start_services(pool: &PgPool) -> Services {
    let broker = Arc::new(InMemoryBroker::new());
    let payments_queue = broker.bind("#");
    let wallet_queue = broker.bind("#");

    let probe = Arc::new(MemoryEventStream::new());
    let fanout = Arc::new(FanoutPublisher::new(broker));
    let publisher: Arc<dyn Publisher> = Arc::new(StoringPublisher::new(
        Arc::clone(&probe) as Arc<dyn EventStream>,
        fanout,
    ));

    let clock = Arc::new(SystemClock);
    let payments = Arc::new(PgPaymentRepository::new(pool.clone()));
    let wallets = Arc::new(PgWalletRepository::new(pool.clone()));
    let transactions = Arc::new(PgTransactionRepository::new(pool.clone()));
    let movements = Arc::new(PgMovementRepository::new(pool.clone()));

    let payments_dispatcher = Arc::new(PaymentEventDispatcher::new(
        clock.clone(),
        payments.clone(),
        publisher.clone(),
    ));
    let wallet_dispatcher = Arc::new(WalletEventDispatcher::new(
        clock.clone(),
        wallets.clone(),
        transactions,
        movements,
        publisher.clone(),
    ));

    let payments_subscriber = Arc::new(QueueSubscriber::new(
        payments_queue,
        payments_dispatcher,
        fast_options("payments-service"),
    ));
    let wallet_subscriber = Arc::new(QueueSubscriber::new(
        wallet_queue,
        wallet_dispatcher,
        fast_options("wallet-service"),
    ));
    payments_subscriber.start().await.unwrap();
    wallet_subscriber.start().await.unwrap();

    Services {
        payments,
        wallets,
        publisher,
        probe,
        payments_subscriber,
        wallet_subscriber,
    }
}

async fn stop_services(services: &Services) {
    services.payments_subscriber.stop().await.unwrap();
    services.wallet_subscriber.stop().await.unwrap();
}

/// Opens and persists a wallet holding `balance` minor units of USD.
async fn seed_wallet(wallets: &PgWalletRepository, balance: i64) -> Wallet {
    let mut wallet = Wallet::open(Uuid::new_v4(), "USD", &SystemClock);
    wallet.balance = Money::new(balance, "USD");
    wallets.save(&wallet).await.unwrap();
    wallet.take_events();
    wallet
}

async fn post_payment(services: &Services, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
    let state = AppState::new(
        services.payments.clone(),
        services.publisher.clone(),
        Arc::new(SystemClock),
        Arc::new(PermissiveVerifier),
    );
    let app = routes::payments::router().with_state(state);

    let request = Request::builder()
        .method("POST")
        .uri("/payments")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn wait_for_status(
    payments: &PgPaymentRepository,
    payment_id: Uuid,
    expected: PaymentStatus,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let payment = payments.find_by_id(payment_id).await.unwrap();
        if payment.as_ref().is_some_and(|p| p.status == expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_happy_path_wallet_payment_completes_and_debits(pool: PgPool) {
    // Arrange — wallet with 1 000.00 USD.
    let services = start_services(&pool).await;
    let wallet = seed_wallet(&services.wallets, 100_000).await;

    // Act — request a 50.00 USD wallet payment.
    let (status, json) = post_payment(
        &services,
        &serde_json::json!({
            "user_id": wallet.user_id,
            "amount": 5000,
            "currency": "USD",
            "payment_method_type": "wallet",
            "wallet_id": wallet.id,
            "description": "e2e happy path",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id: Uuid = json["payment_id"].as_str().unwrap().parse().unwrap();

    // Assert — payment eventually completed, balance 950.00 USD.
    assert!(
        wait_for_status(&services.payments, payment_id, PaymentStatus::Completed).await,
        "payment never completed"
    );
    let wallet_after = services
        .wallets
        .find_by_id(wallet.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(wallet_after.balance, Money::new(95_000, "USD"));

    // Topic set of the whole saga, any order.
    let mut topics: Vec<String> = services
        .probe
        .all()
        .iter()
        .map(|e| e.topic.as_str().to_owned())
        .collect();
    topics.sort();
    topics.dedup();
    let expected = [
        "payment.completed",
        "payment.created",
        "payment.operation.completed",
        "payment.operation.created",
        "payment.processing",
        "wallet.debit.requested",
        "wallet.debited",
        "wallet.movement.created",
    ];
    assert_eq!(topics, expected);

    stop_services(&services).await;
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_insufficient_funds_fails_payment_without_ledger_rows(pool: PgPool) {
    // Arrange — wallet with 10.00 USD, payment of 50.00 USD.
    let services = start_services(&pool).await;
    let wallet = seed_wallet(&services.wallets, 1000).await;

    // Act
    let (status, json) = post_payment(
        &services,
        &serde_json::json!({
            "user_id": wallet.user_id,
            "amount": 5000,
            "currency": "USD",
            "payment_method_type": "wallet",
            "wallet_id": wallet.id,
            "description": "e2e insufficient funds",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id: Uuid = json["payment_id"].as_str().unwrap().parse().unwrap();

    // Assert — payment failed, balance unchanged.
    assert!(
        wait_for_status(&services.payments, payment_id, PaymentStatus::Failed).await,
        "payment never failed"
    );
    let wallet_after = services
        .wallets
        .find_by_id(wallet.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(wallet_after.balance, Money::new(1000, "USD"));

    // The shortfall was announced and carries the failure code downstream.
    let topics: Vec<String> = services
        .probe
        .all()
        .iter()
        .map(|e| e.topic.as_str().to_owned())
        .collect();
    assert!(topics.iter().any(|t| t == "wallet.insufficient.funds"));
    assert!(topics.iter().any(|t| t == "payment.failed"));
    assert!(!topics.iter().any(|t| t == "wallet.debited"));

    // No transaction row was written for the rejected debit.
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE wallet_id = $1")
            .bind(wallet.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);

    stop_services(&services).await;
}
