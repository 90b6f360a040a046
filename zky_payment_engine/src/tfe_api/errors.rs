use thiserror::Error;
use ztg_common::Idr;

use crate::db_types::TransactionStatus;

#[derive(Debug, Clone, Error)]
pub enum PaymentEngineError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Transaction [{0}] was not found.")]
    TransactionNotFound(String),
    #[error("Transaction [{0}] is already in terminal state '{1}'.")]
    TerminalStatus(String, TransactionStatus),
    #[error("Amounts must be positive. Got {0}.")]
    InvalidAmount(Idr),
    #[error("Checkout requests must include a {0}.")]
    MissingField(&'static str),
}
