use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;
use ztg_common::Idr;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{FulfillmentStatus, NewTransaction, ReferenceId, Transaction, TransactionStatus},
};

/// Inserts a new transaction using the given connection. The row starts out `pending` with no QRIS payload; the
/// reference id and fee have already been generated by the flow API.
pub async fn insert_transaction(
    order: NewTransaction,
    reference_id: ReferenceId,
    fee: Idr,
    conn: &mut SqliteConnection,
) -> Result<Transaction, SqliteDatabaseError> {
    let transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                reference_id,
                user_id,
                email,
                whatsapp,
                product_code,
                amount,
                fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(reference_id.as_str())
    .bind(order.user_id)
    .bind(order.email)
    .bind(order.whatsapp)
    .bind(order.product_code)
    .bind(order.amount.value())
    .bind(fee.value())
    .fetch_one(conn)
    .await?;
    Ok(transaction)
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_by_reference(
    reference: &ReferenceId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE reference_id = $1")
        .bind(reference.as_str())
        .fetch_optional(conn)
        .await
}

/// Uniform lookup for public entry points. Numeric keys are store ids; anything else is a reference id.
pub async fn fetch_by_id_or_reference(
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    match key.parse::<i64>() {
        Ok(id) => fetch_by_id(id, conn).await,
        Err(_) => fetch_by_reference(&ReferenceId(key.to_string()), conn).await,
    }
}

/// The poller's work list: pending orders for which a QR code (and thus a provider transaction id) exists.
pub async fn fetch_pollable(conn: &mut SqliteConnection) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM transactions WHERE status = 'pending' AND external_transaction_id IS NOT NULL ORDER BY \
         created_at ASC",
    )
    .fetch_all(conn)
    .await
}

/// Compare-and-set fee assignment. The fee is only written when no fee is stored yet; the stored fee is always
/// read back afterwards so every caller agrees on one value. Re-generating a fee for an order that already has
/// one would desynchronize the expected total used for payment matching.
pub async fn set_fee_if_unset(
    id: i64,
    fee: Idr,
    conn: &mut SqliteConnection,
) -> Result<Idr, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE transactions SET fee = $1 WHERE id = $2 AND fee IS NULL")
        .bind(fee.value())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ Fee {fee} assigned to transaction #{id}");
    }
    let stored: Option<i64> =
        sqlx::query_scalar("SELECT fee FROM transactions WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    stored.map(Idr::from).ok_or_else(|| SqliteDatabaseError::TransactionNotFound(id.to_string()))
}

/// Compare-and-set QRIS attachment. At most one payload is ever persisted per transaction; a caller that loses
/// the race gets the winning row back and must use its payload.
pub async fn set_qris_if_unset(
    id: i64,
    qris_json: &str,
    external_transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Transaction, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE transactions SET qris_data = $1, external_transaction_id = $2 WHERE id = $3 AND qris_data IS NULL",
    )
    .bind(qris_json)
    .bind(external_transaction_id)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ QRIS payload stored for transaction #{id} (provider txid {external_transaction_id})");
    }
    fetch_by_id(id, &mut *conn).await?.ok_or_else(|| SqliteDatabaseError::TransactionNotFound(id.to_string()))
}

/// Guarded forward transition out of `pending`. Terminal rows are left untouched and the caller is told so.
pub async fn update_status_if_pending(
    id: i64,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE transactions SET status = $1 WHERE id = $2 AND status = 'pending'")
        .bind(status.to_string())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Claim the fulfillment dispatch. Exactly one caller per transaction observes `true` here, ever.
pub async fn mark_fulfillment_dispatched(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE transactions SET fulfillment_status = 'dispatched' WHERE id = $1 AND fulfillment_status = 'new'",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn record_fulfillment_attempt(id: i64, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let attempts: Option<i64> = sqlx::query_scalar(
        "UPDATE transactions SET fulfillment_attempts = fulfillment_attempts + 1 WHERE id = $1 RETURNING \
         fulfillment_attempts",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    attempts.ok_or_else(|| SqliteDatabaseError::TransactionNotFound(id.to_string()))
}

pub async fn record_fulfillment_result(
    id: i64,
    status: FulfillmentStatus,
    serial_number: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "UPDATE transactions SET fulfillment_status = $1, serial_number = COALESCE($2, serial_number) WHERE id = $3",
    )
    .bind(status.to_string())
    .bind(serial_number)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Cancel all pending transactions created before the cutoff. `datetime()` normalizes the stored and bound
/// timestamp formats before comparison.
pub async fn cancel_older_than(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, SqliteDatabaseError> {
    let cancelled = sqlx::query_as(
        "UPDATE transactions SET status = 'cancelled' WHERE status = 'pending' AND datetime(created_at) < \
         datetime($1) RETURNING *",
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(cancelled)
}
