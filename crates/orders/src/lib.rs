//! # Orders Crate
//!
//! The thin service layer over the tenant-scoped order repository. It checks
//! caller input, fixes the initial status pair of new orders, and drives the
//! two payment gateway round trips (checkout and redirect confirmation).
//!
//! Persistence and payments are reached through the `OrderStore` and
//! `PaymentGateway` traits, so the flows here run unchanged against
//! PostgreSQL or against in-memory doubles.

pub mod error;
pub mod gateway;
pub mod service;
pub mod store;

#[cfg(test)]
mod mock;

pub use error::{GatewayError, ServiceError};
pub use gateway::{CreatePaymentRequest, GatewayPayment, PaymentGateway};
pub use service::{Checkout, CreateOrderRequest, OrderService};
pub use store::OrderStore;
