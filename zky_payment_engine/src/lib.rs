//! ZkyTopup Payment Engine
//!
//! The payment engine holds the core logic for the ZkyTopup game top-up storefront: the transaction record, the
//! order lifecycle state machine, and payment reconciliation by expected total. It knows nothing about HTTP or
//! about the specific QRIS/fulfillment providers; those live in `okeconnect_tools` and are wired up by the server.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the [`TransactionFlowApi`] instead. The exception is the data types used
//!    in the database, which are defined in the `db_types` module and are public.
//! 2. The lifecycle API ([`TransactionFlowApi`]). Checkout, lazy fee assignment, QRIS attachment, payment
//!    settlement, cancellation and fulfillment bookkeeping all go through here, so the forward-only status
//!    transitions are enforced in exactly one place.
//! 3. Events ([`mod@events`]). When a transaction is settled, a `TransactionPaidEvent` is emitted. A simple actor
//!    framework lets the server hook fulfillment onto this event without the engine ever calling a provider.
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod tfe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, run_migrations, SqliteDatabase, SqliteDatabaseError};
pub use db::traits::TransactionDatabase;
pub use tfe_api::{errors::PaymentEngineError, transaction_flow_api::TransactionFlowApi};
