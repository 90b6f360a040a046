use crate::db_types::Transaction;

/// Emitted exactly once per order, at the moment the payment poller's match flips the status to `success`. The
/// fulfillment dispatcher subscribes to this.
#[derive(Debug, Clone)]
pub struct TransactionPaidEvent {
    pub transaction: Transaction,
}

impl TransactionPaidEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}
