//! Clients for the two external provider APIs the gateway talks to.
//!
//! * [`OrkutApi`] wraps the Orkut QRIS endpoints: issuing a QR code for a given amount, and polling the merchant's
//!   latest settlement status.
//! * [`OkeConnectApi`] wraps the OkeConnect H2H endpoints used to deliver the purchased top-up and to check on a
//!   delivery afterwards. OkeConnect answers in free text, so responses are run through the parsers in [`helpers`].
//!
//! Neither client holds any gateway state. All order bookkeeping lives in `zky_payment_engine`; these types only
//! know how to speak to the providers and how to decode what comes back.
mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;

pub use api::{OkeConnectApi, OrkutApi};
pub use config::{OkeConnectConfig, OrkutConfig, DEFAULT_OKECONNECT_BASE_URL, DEFAULT_ORKUT_BASE_URL};
pub use data_objects::{PaymentStatus, PaymentStatusResponse, QrisPayload, QrisResponse, ReportedAmount, TopupStatus};
pub use error::{OkeConnectApiError, OrkutApiError};
