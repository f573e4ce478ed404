use crate::enums::{DeliveryStatus, PaymentStatus};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted order, as read back from a tenant schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Assigned by the store; unique within the tenant schema only.
    pub id: i64,
    pub user_id: i64,
    pub product_ids: Vec<i64>,
    pub delivery_address: String,
    pub total_price: Decimal,
    /// The shop address the order is fulfilled from.
    pub addresses_shop_id: i64,
    /// Client-side correlation token used by payment redirect callbacks.
    pub payment_key: String,
    /// Set once the payment gateway has created a payment.
    pub payment_id: Option<String>,
    /// Set by the take-order transition.
    pub courier_id: Option<i64>,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the store needs to insert an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: i64,
    pub product_ids: Vec<i64>,
    pub delivery_address: String,
    pub total_price: Decimal,
    pub addresses_shop_id: i64,
    pub payment_key: String,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
}

/// Parses a product id list such as `"3, 17,42"`.
///
/// Surrounding whitespace is ignored and a blank string is an empty list.
/// Anything else that is not a non-negative integer, including empty
/// segments like `"1,,2"`, is rejected.
pub fn parse_product_ids(raw: &str) -> Result<Vec<i64>, CoreError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(CoreError::InvalidProductIds(raw.to_string()));
            }
            part.parse::<i64>()
                .map_err(|_| CoreError::InvalidProductIds(raw.to_string()))
        })
        .collect()
}
