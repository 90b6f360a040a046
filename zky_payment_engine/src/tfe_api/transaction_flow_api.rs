use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use ztg_common::Idr;

use crate::{
    db_types::{FulfillmentStatus, NewTransaction, Transaction, TransactionStatus},
    events::{EventProducers, TransactionPaidEvent},
    helpers,
    tfe_api::errors::PaymentEngineError,
    TransactionDatabase,
};

/// `TransactionFlowApi` is the single entry point for everything that moves an order through its lifecycle:
/// checkout, lazy fee assignment, QRIS attachment, payment settlement, cancellation, expiry, and fulfillment
/// bookkeeping. Keeping the transitions here (rather than spread over route handlers) is what guarantees they
/// stay forward-only and idempotent.
pub struct TransactionFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for TransactionFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionFlowApi")
    }
}

impl<B> TransactionFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> TransactionFlowApi<B>
where B: TransactionDatabase
{
    /// Create a new order from a checkout request.
    ///
    /// The store assigns the public reference id and draws the fee disambiguator here, before the row is
    /// written, so both exist for the entire life of the transaction. The order starts out `pending` with no
    /// QRIS payload; the QR code is issued lazily on first invoice view.
    pub async fn checkout(&self, order: NewTransaction) -> Result<Transaction, PaymentEngineError> {
        if order.user_id.trim().is_empty() {
            return Err(PaymentEngineError::MissingField("user id"));
        }
        if order.product_code.trim().is_empty() {
            return Err(PaymentEngineError::MissingField("product code"));
        }
        if !order.amount.is_positive() {
            return Err(PaymentEngineError::InvalidAmount(order.amount));
        }
        let reference_id = helpers::new_reference_id();
        let fee = helpers::random_fee();
        let transaction = self
            .db
            .insert_transaction(order, reference_id, fee)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        info!(
            "🛒️ Order [{}] created for {} ({} + {} fee)",
            transaction.reference_id,
            transaction.product_code,
            transaction.amount,
            fee
        );
        Ok(transaction)
    }

    /// Fetch a transaction by store id or reference id, as the invoice endpoints do.
    pub async fn fetch_transaction(&self, key: &str) -> Result<Transaction, PaymentEngineError> {
        self.db
            .fetch_transaction_by_id_or_reference(key)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?
            .ok_or_else(|| PaymentEngineError::TransactionNotFound(key.to_string()))
    }

    pub async fn fetch_pollable_transactions(&self) -> Result<Vec<Transaction>, PaymentEngineError> {
        self.db.fetch_pollable_transactions().await.map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))
    }

    /// Return the transaction's fee, assigning one first if it has never been set. The write is conditional on
    /// the fee being absent, and the stored value is read back, so repeated calls (or concurrent tabs) always
    /// observe the same fee. The fee must be durable before any amount comparison takes place.
    pub async fn ensure_fee(&self, transaction: &Transaction) -> Result<Idr, PaymentEngineError> {
        if let Some(fee) = transaction.fee {
            return Ok(fee);
        }
        let fee = self
            .db
            .set_fee_if_unset(transaction.id, helpers::random_fee())
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        debug!("🧮️ Order [{}] now carries fee {fee}", transaction.reference_id);
        Ok(fee)
    }

    /// Attach a freshly issued QRIS payload to the transaction. If a payload is already stored the stored one
    /// wins and is returned; the caller must discard its own. Never overwrites.
    pub async fn attach_qris(
        &self,
        id: i64,
        external_transaction_id: &str,
        qris_json: &serde_json::Value,
    ) -> Result<Transaction, PaymentEngineError> {
        let transaction = self
            .db
            .set_qris_if_unset(id, &qris_json.to_string(), external_transaction_id)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        Ok(transaction)
    }

    /// Try to settle a transaction against a provider-reported amount.
    ///
    /// The match criterion is exact equality with `amount + fee`. The fee exists precisely so that two pending
    /// orders with the same base price have different expected totals, so a looser comparison would defeat it.
    /// A transaction whose fee was never assigned has no expected total and can never match.
    ///
    /// Returns `Some(transaction)` if this call performed the `pending → success` transition, `None` otherwise.
    /// The `TransactionPaidEvent` is published only when the guarded status update took effect, so a duplicate
    /// poll match cannot trigger fulfillment twice.
    pub async fn settle_payment(
        &self,
        id: i64,
        reported_amount: Idr,
    ) -> Result<Option<Transaction>, PaymentEngineError> {
        let transaction = self
            .db
            .fetch_transaction_by_id(id)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?
            .ok_or_else(|| PaymentEngineError::TransactionNotFound(id.to_string()))?;
        if transaction.status.is_terminal() {
            trace!("🔄️💰️ Order [{}] is {}; ignoring settlement report", transaction.reference_id, transaction.status);
            return Ok(None);
        }
        let Some(expected) = transaction.expected_total() else {
            warn!("🔄️💰️ Order [{}] has no fee assigned yet and cannot be matched", transaction.reference_id);
            return Ok(None);
        };
        if reported_amount != expected {
            trace!(
                "🔄️💰️ Order [{}]: reported {reported_amount} does not equal expected {expected}",
                transaction.reference_id
            );
            return Ok(None);
        }
        let flipped = self
            .db
            .update_status_if_pending(id, TransactionStatus::Success)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        if !flipped {
            // Another poll round won the race. That round also published the event.
            debug!("🔄️💰️ Order [{}] was settled concurrently; nothing to do", transaction.reference_id);
            return Ok(None);
        }
        let paid = self.fetch_transaction(&id.to_string()).await?;
        info!("🔄️💰️ Order [{}] settled: {expected} received", paid.reference_id);
        self.call_transaction_paid_hook(&paid).await;
        Ok(Some(paid))
    }

    async fn call_transaction_paid_hook(&self, transaction: &Transaction) {
        for producer in &self.producers.transaction_paid_producer {
            debug!("🔄️💰️ Notifying transaction paid hook subscribers");
            let event = TransactionPaidEvent::new(transaction.clone());
            producer.publish_event(event).await;
        }
    }

    /// Cancel a pending order. Cancellation means "stop watching": no provider-side QR or top-up call is rolled
    /// back. Cancelling an already-terminal order is reported as an error to the caller but changes nothing.
    pub async fn cancel_transaction(&self, key: &str) -> Result<Transaction, PaymentEngineError> {
        let transaction = self.fetch_transaction(key).await?;
        let flipped = self
            .db
            .update_status_if_pending(transaction.id, TransactionStatus::Cancelled)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        if !flipped {
            return Err(PaymentEngineError::TerminalStatus(
                transaction.reference_id.to_string(),
                transaction.status,
            ));
        }
        info!("❌️ Order [{}] cancelled", transaction.reference_id);
        self.fetch_transaction(key).await
    }

    /// Mark a pending order as failed. No automated path drives this; it exists so an operator can close out an
    /// order that will never settle.
    pub async fn fail_transaction(&self, key: &str) -> Result<Transaction, PaymentEngineError> {
        let transaction = self.fetch_transaction(key).await?;
        let flipped = self
            .db
            .update_status_if_pending(transaction.id, TransactionStatus::Failed)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        if !flipped {
            return Err(PaymentEngineError::TerminalStatus(
                transaction.reference_id.to_string(),
                transaction.status,
            ));
        }
        warn!("❌️ Order [{}] marked as failed", transaction.reference_id);
        self.fetch_transaction(key).await
    }

    /// Cancel pending orders older than `max_age`. Driven by the expiry worker when the expiry policy is
    /// enabled; a zero or negative age is treated as "policy disabled" and cancels nothing.
    pub async fn expire_unpaid_transactions(&self, max_age: Duration) -> Result<Vec<Transaction>, PaymentEngineError> {
        if max_age <= Duration::zero() {
            return Ok(Vec::new());
        }
        let cutoff = Utc::now() - max_age;
        let expired = self
            .db
            .cancel_transactions_older_than(cutoff)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))?;
        for transaction in &expired {
            info!("🕰️ Order [{}] expired after waiting unpaid since {}", transaction.reference_id, transaction.created_at);
        }
        Ok(expired)
    }

    /// Claim the right to dispatch fulfillment for a paid order. Returns `true` exactly once per transaction.
    pub async fn claim_fulfillment(&self, id: i64) -> Result<bool, PaymentEngineError> {
        self.db.mark_fulfillment_dispatched(id).await.map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))
    }

    /// Record one fulfillment status-check attempt; returns the total attempts so far.
    pub async fn record_fulfillment_attempt(&self, id: i64) -> Result<i64, PaymentEngineError> {
        self.db.record_fulfillment_attempt(id).await.map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))
    }

    pub async fn complete_fulfillment(
        &self,
        id: i64,
        serial_number: Option<&str>,
    ) -> Result<(), PaymentEngineError> {
        self.db
            .record_fulfillment_result(id, FulfillmentStatus::Fulfilled, serial_number)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))
    }

    pub async fn fail_fulfillment(&self, id: i64) -> Result<(), PaymentEngineError> {
        self.db
            .record_fulfillment_result(id, FulfillmentStatus::Failed, None)
            .await
            .map_err(|e| PaymentEngineError::DatabaseError(e.to_string()))
    }
}
