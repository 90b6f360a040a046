use regex::Regex;
use sqlx::migrate::MigrateDatabase;
use sqlx::Sqlite;
use zky_payment_engine::{
    db_types::{FulfillmentStatus, NewTransaction, TransactionStatus},
    events::EventProducers,
    helpers::{MAX_FEE, MIN_FEE},
    PaymentEngineError,
    SqliteDatabase,
    TransactionDatabase,
    TransactionFlowApi,
};
use ztg_common::Idr;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

mod support;

async fn setup() -> TransactionFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    TransactionFlowApi::new(db, EventProducers::default())
}

async fn tear_down(mut api: TransactionFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        log::error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[tokio::test]
async fn checkout_creates_a_pending_order_with_reference_and_fee() {
    let api = setup().await;
    let order = NewTransaction::new("U1", "P100", Idr::from(20_000));
    let transaction = api.checkout(order).await.expect("Error creating order");
    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert_eq!(transaction.amount, Idr::from(20_000));
    let fee = transaction.fee.expect("fee must be assigned at checkout").value();
    assert!((MIN_FEE..=MAX_FEE).contains(&fee));
    let re = Regex::new(r"^ZKY[A-Z0-9]{8}$").unwrap();
    assert!(re.is_match(transaction.reference_id.as_str()));
    assert!(transaction.qris_data.is_none());
    assert_eq!(transaction.fulfillment_status, FulfillmentStatus::New);
    tear_down(api).await;
}

#[tokio::test]
async fn checkout_rejects_incomplete_or_invalid_input() {
    let api = setup().await;
    let r = api.checkout(NewTransaction::new("", "P100", Idr::from(1_000))).await;
    assert!(matches!(r, Err(PaymentEngineError::MissingField("user id"))));
    let r = api.checkout(NewTransaction::new("U1", "", Idr::from(1_000))).await;
    assert!(matches!(r, Err(PaymentEngineError::MissingField("product code"))));
    let r = api.checkout(NewTransaction::new("U1", "P100", Idr::from(0))).await;
    assert!(matches!(r, Err(PaymentEngineError::InvalidAmount(_))));
    let r = api.checkout(NewTransaction::new("U1", "P100", Idr::from(-500))).await;
    assert!(matches!(r, Err(PaymentEngineError::InvalidAmount(_))));
    tear_down(api).await;
}

#[tokio::test]
async fn fee_never_changes_after_first_assignment() {
    let api = setup().await;
    // A row without a fee, as legacy checkout paths could leave behind.
    sqlx::query("INSERT INTO transactions (reference_id, user_id, product_code, amount) VALUES ($1, $2, $3, $4)")
        .bind("ZKYAAAA0001")
        .bind("U1")
        .bind("P100")
        .bind(20_000_i64)
        .execute(api.db().pool())
        .await
        .unwrap();
    let transaction = api.fetch_transaction("ZKYAAAA0001").await.unwrap();
    assert!(transaction.fee.is_none());
    let first = api.ensure_fee(&transaction).await.unwrap();
    assert!((MIN_FEE..=MAX_FEE).contains(&first.value()));
    // Every subsequent call (and every re-read) must return the stored fee, never a fresh draw.
    for _ in 0..20 {
        let transaction = api.fetch_transaction("ZKYAAAA0001").await.unwrap();
        assert_eq!(transaction.fee, Some(first));
        let fee = api.ensure_fee(&transaction).await.unwrap();
        assert_eq!(fee, first);
    }
    let stored = api.fetch_transaction("ZKYAAAA0001").await.unwrap();
    assert_eq!(stored.fee, Some(first));
    tear_down(api).await;
}

#[tokio::test]
async fn qris_payload_is_attached_at_most_once() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let first_payload = serde_json::json!({
        "success": true,
        "result": {"transactionId": "TX-1", "qrImageUrl": "https://cdn.example.com/qr/TX-1.png"}
    });
    let stored = api.attach_qris(transaction.id, "TX-1", &first_payload).await.unwrap();
    assert_eq!(stored.external_transaction_id.as_deref(), Some("TX-1"));
    assert_eq!(stored.qris(), Some(first_payload.clone()));
    // A second issuance attempt must not replace the stored payload.
    let second_payload = serde_json::json!({
        "success": true,
        "result": {"transactionId": "TX-2", "qrImageUrl": "https://cdn.example.com/qr/TX-2.png"}
    });
    let stored = api.attach_qris(transaction.id, "TX-2", &second_payload).await.unwrap();
    assert_eq!(stored.external_transaction_id.as_deref(), Some("TX-1"));
    assert_eq!(stored.qris(), Some(first_payload));
    tear_down(api).await;
}

#[tokio::test]
async fn settlement_requires_the_exact_expected_total() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let expected = transaction.expected_total().unwrap();
    // The base amount alone (fee missing from the payment) must not settle the order.
    let result = api.settle_payment(transaction.id, transaction.amount).await.unwrap();
    assert!(result.is_none());
    let unchanged = api.fetch_transaction(transaction.reference_id.as_str()).await.unwrap();
    assert_eq!(unchanged.status, TransactionStatus::Pending);
    // An overpayment does not settle either; the criterion is equality, not >=.
    let result = api.settle_payment(transaction.id, expected + Idr::from(1)).await.unwrap();
    assert!(result.is_none());
    // The exact total does.
    let result = api.settle_payment(transaction.id, expected).await.unwrap();
    let paid = result.expect("exact total must settle the order");
    assert_eq!(paid.status, TransactionStatus::Success);
    tear_down(api).await;
}

#[tokio::test]
async fn cancelled_orders_are_terminal() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let expected = transaction.expected_total().unwrap();
    let cancelled = api.cancel_transaction(transaction.reference_id.as_str()).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    // A straggling poll tick after cancellation must be a no-op.
    let result = api.settle_payment(transaction.id, expected).await.unwrap();
    assert!(result.is_none());
    let still_cancelled = api.fetch_transaction(transaction.reference_id.as_str()).await.unwrap();
    assert_eq!(still_cancelled.status, TransactionStatus::Cancelled);
    // Cancelling again is rejected but harmless.
    let r = api.cancel_transaction(transaction.reference_id.as_str()).await;
    assert!(matches!(r, Err(PaymentEngineError::TerminalStatus(_, TransactionStatus::Cancelled))));
    tear_down(api).await;
}

#[tokio::test]
async fn settled_orders_cannot_be_cancelled() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let expected = transaction.expected_total().unwrap();
    api.settle_payment(transaction.id, expected).await.unwrap().expect("order should settle");
    let r = api.cancel_transaction(transaction.reference_id.as_str()).await;
    assert!(matches!(r, Err(PaymentEngineError::TerminalStatus(_, TransactionStatus::Success))));
    tear_down(api).await;
}

#[tokio::test]
async fn lookup_works_by_store_id_and_by_reference() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let by_id = api.fetch_transaction(&transaction.id.to_string()).await.unwrap();
    let by_reference = api.fetch_transaction(transaction.reference_id.as_str()).await.unwrap();
    assert_eq!(by_id.id, by_reference.id);
    let missing = api.fetch_transaction("ZKYNOSUCHID").await;
    assert!(matches!(missing, Err(PaymentEngineError::TransactionNotFound(_))));
    tear_down(api).await;
}

#[tokio::test]
async fn pollable_transactions_are_pending_with_a_provider_txid() {
    let api = setup().await;
    let with_qr = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let payload = serde_json::json!({"success": true, "result": {"transactionId": "TX-9", "qrImageUrl": "u"}});
    api.attach_qris(with_qr.id, "TX-9", &payload).await.unwrap();
    // No QR yet: not pollable.
    let _without_qr = api.checkout(NewTransaction::new("U2", "P100", Idr::from(20_000))).await.unwrap();
    // Cancelled: not pollable either.
    let cancelled = api.checkout(NewTransaction::new("U3", "P100", Idr::from(20_000))).await.unwrap();
    api.attach_qris(cancelled.id, "TX-10", &payload).await.unwrap();
    api.cancel_transaction(cancelled.reference_id.as_str()).await.unwrap();
    let pollable = api.fetch_pollable_transactions().await.unwrap();
    assert_eq!(pollable.len(), 1);
    assert_eq!(pollable[0].id, with_qr.id);
    tear_down(api).await;
}

#[tokio::test]
async fn expiry_policy_cancels_only_old_pending_orders() {
    let api = setup().await;
    let stale = api.checkout(NewTransaction::new("U1", "P100", Idr::from(20_000))).await.unwrap();
    let fresh = api.checkout(NewTransaction::new("U2", "P100", Idr::from(20_000))).await.unwrap();
    // Age the first order artificially.
    sqlx::query("UPDATE transactions SET created_at = datetime('now', '-2 hours') WHERE id = $1")
        .bind(stale.id)
        .execute(api.db().pool())
        .await
        .unwrap();
    // A disabled policy expires nothing.
    let expired = api.expire_unpaid_transactions(chrono::Duration::zero()).await.unwrap();
    assert!(expired.is_empty());
    let expired = api.expire_unpaid_transactions(chrono::Duration::minutes(60)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
    assert_eq!(expired[0].status, TransactionStatus::Cancelled);
    let fresh = api.fetch_transaction(fresh.reference_id.as_str()).await.unwrap();
    assert_eq!(fresh.status, TransactionStatus::Pending);
    tear_down(api).await;
}

#[tokio::test]
async fn fulfillment_bookkeeping_round_trip() {
    let api = setup().await;
    let transaction = api.checkout(NewTransaction::new("U1", "ML86", Idr::from(20_000))).await.unwrap();
    let expected = transaction.expected_total().unwrap();
    api.settle_payment(transaction.id, expected).await.unwrap().expect("order should settle");
    // Only the first claimant gets to dispatch.
    assert!(api.claim_fulfillment(transaction.id).await.unwrap());
    assert!(!api.claim_fulfillment(transaction.id).await.unwrap());
    assert_eq!(api.record_fulfillment_attempt(transaction.id).await.unwrap(), 1);
    assert_eq!(api.record_fulfillment_attempt(transaction.id).await.unwrap(), 2);
    api.complete_fulfillment(transaction.id, Some("GM240501XYZ")).await.unwrap();
    let done = api.fetch_transaction(transaction.reference_id.as_str()).await.unwrap();
    assert_eq!(done.fulfillment_status, FulfillmentStatus::Fulfilled);
    assert_eq!(done.fulfillment_attempts, 2);
    assert_eq!(done.serial_number.as_deref(), Some("GM240501XYZ"));
    tear_down(api).await;
}
