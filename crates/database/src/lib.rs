//! # Database Crate
//!
//! Tenant-isolated persistence on a single PostgreSQL server. Every tenant
//! (shop) owns one schema; this crate owns the handles into those schemas and
//! everything that runs through them.
//!
//! ## Architectural Principles
//!
//! - **One handle per tenant:** `TenantRegistry` opens a pool lazily on first
//!   use, never twice for the same tenant, and keeps it healthy with a
//!   background keep-alive task that can be stopped per tenant.
//! - **Driver behind a seam:** the registry talks to a `Connector`;
//!   `PgConnector` is the PostgreSQL implementation.
//! - **Conditional updates:** repository transitions are single `UPDATE`
//!   statements, and "zero rows affected" is the not-found signal.
//!
//! ## Public API
//!
//! - `TenantRegistry` / `PgRegistry`: per-tenant handle lookup.
//! - `SchemaManager`: provision, migrate and decommission tenant schemas.
//! - `OrderRepository`: order, courier and payment transitions and reads.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod migrations;
pub mod registry;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect_options, Connector, PgConnector};
pub use error::DbError;
pub use lifecycle::SchemaManager;
pub use registry::{PgRegistry, TenantRegistry};
pub use repository::OrderRepository;

use configuration::Config;

/// Builds the PostgreSQL-backed registry from application settings.
pub fn registry_from_config(config: &Config) -> PgRegistry {
    let connector = PgConnector::new(&config.database, config.pool.clone());
    TenantRegistry::from_settings(connector, &config.pool)
}
