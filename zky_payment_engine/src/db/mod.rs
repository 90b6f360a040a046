//! Database management and control.
//!
//! This module defines the interface contract a storage backend must satisfy to carry the transaction store
//! ([`traits::TransactionDatabase`]), and the SQLite implementation of it ([`sqlite::SqliteDatabase`]).
//!
//! The transaction record is the only shared mutable resource in the system. Every "set once" field (the fee, the
//! QRIS payload) and every status transition is expressed as a conditional UPDATE so that concurrent
//! sessions racing on the same invoice cannot desynchronize it.
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
