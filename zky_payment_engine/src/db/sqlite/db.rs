use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use ztg_common::Idr;

use super::{new_pool, transactions, SqliteDatabaseError};
use crate::{
    db::traits::TransactionDatabase,
    db_types::{FulfillmentStatus, NewTransaction, ReferenceId, Transaction, TransactionStatus},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool against the given database URL.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TransactionDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_transaction(
        &self,
        order: NewTransaction,
        reference_id: ReferenceId,
        fee: Idr,
    ) -> Result<Transaction, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_transaction(order, reference_id, fee, &mut conn).await
    }

    async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_id(id, &mut conn).await?)
    }

    async fn fetch_transaction_by_reference(
        &self,
        reference: &ReferenceId,
    ) -> Result<Option<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_reference(reference, &mut conn).await?)
    }

    async fn fetch_transaction_by_id_or_reference(&self, key: &str) -> Result<Option<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_id_or_reference(key, &mut conn).await?)
    }

    async fn fetch_pollable_transactions(&self) -> Result<Vec<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_pollable(&mut conn).await?)
    }

    async fn set_fee_if_unset(&self, id: i64, fee: Idr) -> Result<Idr, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::set_fee_if_unset(id, fee, &mut conn).await
    }

    async fn set_qris_if_unset(
        &self,
        id: i64,
        qris_json: &str,
        external_transaction_id: &str,
    ) -> Result<Transaction, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::set_qris_if_unset(id, qris_json, external_transaction_id, &mut conn).await
    }

    async fn update_status_if_pending(&self, id: i64, status: TransactionStatus) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::update_status_if_pending(id, status, &mut conn).await
    }

    async fn mark_fulfillment_dispatched(&self, id: i64) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::mark_fulfillment_dispatched(id, &mut conn).await
    }

    async fn record_fulfillment_attempt(&self, id: i64) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_fulfillment_attempt(id, &mut conn).await
    }

    async fn record_fulfillment_result(
        &self,
        id: i64,
        status: FulfillmentStatus,
        serial_number: Option<&str>,
    ) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_fulfillment_result(id, status, serial_number, &mut conn).await
    }

    async fn cancel_transactions_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::cancel_older_than(cutoff, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}
