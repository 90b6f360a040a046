mod transaction_database;

pub use transaction_database::TransactionDatabase;
