use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use ztg_common::Idr;

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The order has been created and no matching payment has been seen yet.
    Pending,
    /// A settlement matching the expected total was observed. Fulfillment is driven off this transition.
    Success,
    /// The order failed. No automated path drives this transition; it exists for completeness.
    Failed,
    /// The order was cancelled by the customer (or by the expiry policy) while still pending.
    Cancelled,
}

impl TransactionStatus {
    /// `success`, `failed` and `cancelled` are terminal. No code path transitions out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Failed => write!(f, "failed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction status: {value}. But this conversion cannot fail. Defaulting to pending");
            TransactionStatus::Pending
        })
    }
}

//--------------------------------------  FulfillmentStatus  ---------------------------------------------------------
/// The fulfillment sub-state of a paid order. Kept separate from [`TransactionStatus`] because the customer-facing
/// order state is already `success` once the payment matched; delivery happens behind it, with bounded retries and
/// its own terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    /// No dispatch has been attempted.
    New,
    /// The top-up call has been fired and status checks are in flight.
    Dispatched,
    /// The provider confirmed delivery.
    Fulfilled,
    /// Delivery could not be confirmed within the retry budget.
    Failed,
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::New => write!(f, "new"),
            FulfillmentStatus::Dispatched => write!(f, "dispatched"),
            FulfillmentStatus::Fulfilled => write!(f, "fulfilled"),
            FulfillmentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "dispatched" => Ok(Self::Dispatched),
            "fulfilled" => Ok(Self::Fulfilled),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid fulfillment status: {s}"))),
        }
    }
}

//--------------------------------------     ReferenceId     ---------------------------------------------------------
/// The public, customer-facing order identifier, e.g. `ZKY7H2K9QD41`. Generated once at checkout and never
/// changed; customers use it to track their invoice.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ReferenceId(pub String);

impl FromStr for ReferenceId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ReferenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ReferenceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     Transaction     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub reference_id: ReferenceId,
    /// Assigned by the QRIS provider once a QR code has been issued. Absent until then.
    pub external_transaction_id: Option<String>,
    /// The destination game account. Opaque; never validated for existence.
    pub user_id: String,
    pub email: String,
    pub whatsapp: String,
    pub product_code: String,
    /// Base price of the package. Immutable once set.
    pub amount: Idr,
    /// The randomized disambiguation surcharge. Set at most once; `None` until first assignment.
    pub fee: Option<Idr>,
    /// The QRIS provider payload, stored verbatim as JSON text. Set at most once.
    pub qris_data: Option<String>,
    pub status: TransactionStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub fulfillment_attempts: i64,
    pub serial_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// The total a settlement must equal for this order to be considered paid. `None` while the fee has not been
    /// assigned yet; an order without a fee can never match a payment.
    pub fn expected_total(&self) -> Option<Idr> {
        self.fee.map(|fee| self.amount + fee)
    }

    /// The stored QRIS payload, parsed back into JSON. A corrupt payload is logged and treated as absent.
    pub fn qris(&self) -> Option<serde_json::Value> {
        let raw = self.qris_data.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Transaction {} carries an unparseable QRIS payload: {e}", self.reference_id);
                None
            },
        }
    }
}

//--------------------------------------    NewTransaction    --------------------------------------------------------
/// A checkout request, before the store has assigned a reference id or fee.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub whatsapp: String,
    pub product_code: String,
    pub amount: Idr,
}

impl NewTransaction {
    pub fn new<S1: Into<String>, S2: Into<String>>(user_id: S1, product_code: S2, amount: Idr) -> Self {
        Self {
            user_id: user_id.into(),
            email: String::default(),
            whatsapp: String::default(),
            product_code: product_code.into(),
            amount,
        }
    }
}
