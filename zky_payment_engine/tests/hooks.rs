use std::{
    sync::{atomic::AtomicI32, Arc},
    time::Duration,
};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use zky_payment_engine::{
    db_types::NewTransaction,
    events::{EventHandlers, EventHooks},
    SqliteDatabase,
    TransactionDatabase,
    TransactionFlowApi,
};
use ztg_common::Idr;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

mod support;

async fn setup(hooks: EventHooks) -> TransactionFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    TransactionFlowApi::new(db, producers)
}

async fn tear_down(mut api: TransactionFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[tokio::test]
async fn paid_hook_fires_once_per_settlement() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_transaction_paid(move |ev| {
        info!("🪝️ Order [{}] paid", ev.transaction.reference_id);
        event_copy.called();
        Box::pin(async {})
    });
    let api = setup(hooks).await;
    let transaction = api.checkout(NewTransaction::new("U1", "ML86", Idr::from(15_000))).await.expect("checkout failed");
    let expected = transaction.expected_total().expect("fee assigned at checkout");
    let paid = api.settle_payment(transaction.id, expected).await.expect("settlement failed");
    assert!(paid.is_some());
    // A duplicate settlement report arrives on the next poll round. The status flip already happened, so the
    // hook must not fire again.
    let paid = api.settle_payment(transaction.id, expected).await.expect("settlement failed");
    assert!(paid.is_none());
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(event.count(), 1);
    tear_down(api).await;
    info!("🪝️ test complete");
}

#[tokio::test]
async fn mismatched_amount_does_not_fire_the_hook() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_transaction_paid(move |ev| {
        info!("🪝️ Order [{}] paid", ev.transaction.reference_id);
        event_copy.called();
        Box::pin(async {})
    });
    let api = setup(hooks).await;
    let transaction = api.checkout(NewTransaction::new("U1", "ML86", Idr::from(15_000))).await.expect("checkout failed");
    // Base amount without the fee never matches.
    let paid = api.settle_payment(transaction.id, transaction.amount).await.expect("settlement failed");
    assert!(paid.is_none());
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(event.count(), 0);
    tear_down(api).await;
    info!("🪝️ test complete");
}
