use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid data: {0}")]
    InvalidData(#[from] core_types::CoreError),

    #[error("Schema '{0}' does not exist.")]
    SchemaNotFound(String),

    #[error("Schema '{0}' already exists.")]
    AlreadyExists(String),

    #[error("Schema '{0}' is reserved and cannot be provisioned or dropped.")]
    ReservedSchema(String),

    #[error("Order {0} not found, nothing to take.")]
    TakeOrderNotFound(i64),

    #[error("Order {order_id} is not assigned to courier {courier_id}.")]
    OrderCourierMismatch { courier_id: i64, order_id: i64 },

    #[error("Order {0} not found.")]
    OrderNotFound(i64),

    #[error("No order with payment key '{0}'.")]
    PaymentKeyNotFound(String),

    #[error("Order {0} not found, payment id was not stored.")]
    PaymentIdUpdateNotFound(i64),

    #[error("An order with payment key '{0}' already exists.")]
    DuplicatePaymentKey(String),
}

impl DbError {
    /// True for every kind that means "the addressed row or schema is absent".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DbError::SchemaNotFound(_)
                | DbError::TakeOrderNotFound(_)
                | DbError::OrderCourierMismatch { .. }
                | DbError::OrderNotFound(_)
                | DbError::PaymentKeyNotFound(_)
                | DbError::PaymentIdUpdateNotFound(_)
        )
    }
}
