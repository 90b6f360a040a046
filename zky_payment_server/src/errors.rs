use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use okeconnect_tools::{OkeConnectApiError, OrkutApiError};
use thiserror::Error;
use zky_payment_engine::{db_types::TransactionStatus, PaymentEngineError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Order {0} is already {1} and cannot be modified.")]
    OrderClosed(String, TransactionStatus),
    #[error("The payment provider returned an error. {0}")]
    PaymentProviderError(#[from] OrkutApiError),
    #[error("The fulfillment provider returned an error. {0}")]
    FulfillmentProviderError(#[from] OkeConnectApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::OrderClosed(_, _) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::FulfillmentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentEngineError> for ServerError {
    fn from(e: PaymentEngineError) -> Self {
        match e {
            PaymentEngineError::TransactionNotFound(key) => Self::NoRecordFound(key),
            PaymentEngineError::MissingField(field) => Self::InvalidRequestBody(format!("{field} is required")),
            PaymentEngineError::InvalidAmount(amount) => {
                Self::InvalidRequestBody(format!("{amount} is not a valid order amount"))
            },
            PaymentEngineError::TerminalStatus(id, status) => Self::OrderClosed(id, status),
            PaymentEngineError::DatabaseError(msg) => Self::BackendError(format!("Database error: {msg}")),
        }
    }
}
