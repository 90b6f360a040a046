//! # ZkyTopup server
//! This crate hosts the storefront's HTTP surface and its background workers. It is responsible for:
//! * Accepting checkout requests and serving invoice views.
//! * Issuing (or re-serving) QRIS codes for pending orders.
//! * Polling the payment provider and settling orders whose expected total arrives.
//! * Dispatching game top-ups when an order is paid, with bounded status-check retries.
//!
//! ## Configuration
//! The server is configured via `ZTG_`-prefixed environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/checkout`: Create a new order.
//! * `/api/invoice/{id}`: Invoice view; lazily issues the QRIS payload on a pending order.
//! * `/api/invoice/{id}/status`: Lightweight status for UI polling.
//! * `/api/invoice/{id}/cancel`: Cancel a pending order.
//! * `/api/invoice/{id}/check-payment`: Run one payment-poll round for a single order.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod integrations;
pub mod payment_worker;
pub mod routes;
pub mod server;
