//! # Core Types
//!
//! The vocabulary shared by every other crate in the workspace: who a tenant
//! is, what an order looks like, and the fixed delivery/payment status
//! enumerations seeded into each tenant schema.
//!
//! This crate has no I/O. It depends on nothing inside the workspace.

pub mod enums;
pub mod error;
pub mod structs;
pub mod tenant;

// Re-export the core types to provide a clean public API.
pub use enums::{DeliveryStatus, PaymentStatus};
pub use error::CoreError;
pub use structs::{parse_product_ids, NewOrder, Order};
pub use tenant::TenantId;
