pub mod errors;
pub mod transaction_flow_api;
