use serde::Serialize;
use zky_payment_engine::db_types::{Transaction, TransactionStatus};
use ztg_common::Idr;

/// What the invoice page renders: the transaction itself, the total the customer must transfer (base amount plus
/// the fee disambiguator), and the stored QRIS payload, if one has been issued.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResult {
    pub transaction: Transaction,
    pub expected_total: Option<Idr>,
    pub qris: Option<serde_json::Value>,
}

impl From<Transaction> for InvoiceResult {
    fn from(transaction: Transaction) -> Self {
        let expected_total = transaction.expected_total();
        let qris = transaction.qris();
        Self { transaction, expected_total, qris }
    }
}

/// Result of a manual payment check. `settled` is true only if this particular check performed the settlement;
/// an order that was already closed (settled or otherwise) reports `settled: false` with its current status.
#[derive(Debug, Clone, Serialize)]
pub struct CheckPaymentResult {
    pub settled: bool,
    pub status: TransactionStatus,
}
