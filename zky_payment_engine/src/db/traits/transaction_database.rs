use chrono::{DateTime, Utc};
use ztg_common::Idr;

use crate::db_types::{FulfillmentStatus, NewTransaction, ReferenceId, Transaction, TransactionStatus};

/// The storage contract for the transaction store.
///
/// The write operations fall into two groups:
/// * Set-once fields (`fee`, `qris_data`). These are compare-and-set updates: the value is written only if the
///   field is currently absent, and the caller always reads back whatever ended up stored. Two browser tabs
///   racing on the same invoice converge on a single fee and a single QR code.
/// * Status transitions. These are guarded on the current status, so a transition handler may be invoked any
///   number of times without corrupting state. `success`, `failed` and `cancelled` are terminal.
#[allow(async_fn_in_trait)]
pub trait TransactionDatabase: Clone {
    type Error: std::error::Error;

    /// The URL of the database.
    fn url(&self) -> &str;

    /// Insert a brand-new transaction in `pending` state, with the given store-generated reference id and fee.
    async fn insert_transaction(
        &self,
        order: NewTransaction,
        reference_id: ReferenceId,
        fee: Idr,
    ) -> Result<Transaction, Self::Error>;

    async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, Self::Error>;

    async fn fetch_transaction_by_reference(&self, reference: &ReferenceId)
        -> Result<Option<Transaction>, Self::Error>;

    /// Uniform lookup used by all public entry points: if `key` parses as a store id, the store id wins;
    /// otherwise it is treated as a reference id.
    async fn fetch_transaction_by_id_or_reference(&self, key: &str) -> Result<Option<Transaction>, Self::Error>;

    /// All transactions the payment poller should be watching: `pending` with a known provider transaction id.
    async fn fetch_pollable_transactions(&self) -> Result<Vec<Transaction>, Self::Error>;

    /// Set the fee if it has not been set yet, and return the fee that is stored afterwards (which may differ
    /// from `fee` if another writer got there first).
    async fn set_fee_if_unset(&self, id: i64, fee: Idr) -> Result<Idr, Self::Error>;

    /// Attach the QRIS payload and provider transaction id if no payload is stored yet. Returns the transaction
    /// as stored afterwards, i.e. with whichever payload won.
    async fn set_qris_if_unset(
        &self,
        id: i64,
        qris_json: &str,
        external_transaction_id: &str,
    ) -> Result<Transaction, Self::Error>;

    /// Transition a `pending` transaction to the given (terminal) status. Returns `true` if this call performed
    /// the transition and `false` if the transaction was no longer pending.
    async fn update_status_if_pending(&self, id: i64, status: TransactionStatus) -> Result<bool, Self::Error>;

    /// Claim the fulfillment dispatch: `new` → `dispatched`. Returns `true` only for the caller that performed
    /// the claim, which is what makes "fulfillment triggered" idempotent across duplicate paid events.
    async fn mark_fulfillment_dispatched(&self, id: i64) -> Result<bool, Self::Error>;

    /// Bump the status-check attempt counter and return the new count.
    async fn record_fulfillment_attempt(&self, id: i64) -> Result<i64, Self::Error>;

    /// Record the terminal fulfillment outcome and, for successful deliveries, the serial number.
    async fn record_fulfillment_result(
        &self,
        id: i64,
        status: FulfillmentStatus,
        serial_number: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Cancel all `pending` transactions created before `cutoff`, returning the affected rows.
    async fn cancel_transactions_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Transaction>, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
