use core_types::CoreError;
use database::DbError;
use thiserror::Error;

/// A failed call to the external payment gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Payment gateway request failed: {0}")]
pub struct GatewayError(pub String);

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid product id list '{0}'")]
    InvalidProductIds(String),

    #[error("Invalid input: {0}")]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ServiceError {
    /// The HTTP status a boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidProductIds(_) => 400,
            ServiceError::Core(CoreError::UnknownStatus { .. }) => 500,
            ServiceError::Core(_) => 400,
            ServiceError::Database(db) if db.is_not_found() => 404,
            ServiceError::Database(DbError::AlreadyExists(_) | DbError::DuplicatePaymentKey(_)) => 409,
            ServiceError::Database(DbError::ReservedSchema(_)) => 400,
            ServiceError::Database(_) => 500,
            ServiceError::Gateway(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_onto_http_statuses() {
        let cases = [
            (ServiceError::InvalidProductIds("1,,2".into()), 400),
            (CoreError::InvalidTenant("Bad!".into(), "bad character".into()).into(), 400),
            (
                CoreError::UnknownStatus { kind: "delivery", code: "Lost".into() }.into(),
                500,
            ),
            (DbError::SchemaNotFound("shop".into()).into(), 404),
            (DbError::TakeOrderNotFound(999).into(), 404),
            (DbError::OrderCourierMismatch { courier_id: 6, order_id: 10 }.into(), 404),
            (DbError::PaymentKeyNotFound("k".into()).into(), 404),
            (DbError::PaymentIdUpdateNotFound(1).into(), 404),
            (DbError::AlreadyExists("shop".into()).into(), 409),
            (DbError::DuplicatePaymentKey("k".into()).into(), 409),
            (DbError::ReservedSchema("public".into()).into(), 400),
            (DbError::Timeout(std::time::Duration::from_secs(1)).into(), 500),
            (GatewayError("503 from upstream".into()).into(), 502),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{err}");
        }
    }
}
