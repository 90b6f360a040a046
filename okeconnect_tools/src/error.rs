use thiserror::Error;
use ztg_common::Idr;

#[derive(Debug, Error)]
pub enum OrkutApiError {
    #[error("Could not initialize the QRIS client. {0}")]
    Initialization(String),
    #[error("QRIS amounts must be positive. Got {0}.")]
    InvalidAmount(Idr),
    #[error("The request to the QRIS provider timed out.")]
    Timeout,
    #[error("Error sending request to the QRIS provider. {0}")]
    RequestError(String),
    #[error("The QRIS provider returned status {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not decode the QRIS provider response. {0}")]
    JsonError(String),
    #[error("The QRIS provider reported a failure. {0}")]
    ProviderFailure(String),
}

#[derive(Debug, Error)]
pub enum OkeConnectApiError {
    #[error("Could not initialize the H2H client. {0}")]
    Initialization(String),
    #[error("The request to the H2H provider timed out.")]
    Timeout,
    #[error("Error sending request to the H2H provider. {0}")]
    RequestError(String),
    #[error("The H2H provider returned status {status}. {message}")]
    QueryError { status: u16, message: String },
}
