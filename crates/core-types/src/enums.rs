use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an order is on the delivery side.
///
/// The variants mirror the rows seeded into every tenant's `delivery_status`
/// lookup table. The declaration order is the seed order, so the row id of a
/// status is its position in `ALL` plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    WaitingProcessing,
    ProcessOfDelivery,
    Delivered,
    /// Display state for orders whose payment has not arrived yet.
    WaitingPayment,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 4] = [
        DeliveryStatus::WaitingProcessing,
        DeliveryStatus::ProcessOfDelivery,
        DeliveryStatus::Delivered,
        DeliveryStatus::WaitingPayment,
    ];

    /// The stable code stored in the `code` column of `delivery_status`.
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryStatus::WaitingProcessing => "WaitingProcessing",
            DeliveryStatus::ProcessOfDelivery => "ProcessOfDelivery",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::WaitingPayment => "WaitingPayment",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryStatus::WaitingProcessing => "Waiting for processing",
            DeliveryStatus::ProcessOfDelivery => "Out for delivery",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::WaitingPayment => "Waiting for payment",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DeliveryStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| CoreError::UnknownStatus {
                kind: "delivery",
                code: s.to_string(),
            })
    }
}

/// Where an order is on the payment side. Seeded into `payment_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    WaitingPayment,
    Paid,
    Canceled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::WaitingPayment,
        PaymentStatus::Paid,
        PaymentStatus::Canceled,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PaymentStatus::WaitingPayment => "WaitingPayment",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Canceled => "Canceled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentStatus::WaitingPayment => "Waiting for payment",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| CoreError::UnknownStatus {
                kind: "payment",
                code: s.to_string(),
            })
    }
}
