pub mod fulfillment;
pub mod qris;
