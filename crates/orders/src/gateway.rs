use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Gateway status of a payment the customer has completed.
pub const STATUS_SUCCEEDED: &str = "succeeded";

/// A redirect payment to register with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    /// Decimal amount with exactly two fraction digits, e.g. `"1299.90"`.
    pub amount: String,
    pub currency: String,
    /// Where the gateway sends the customer once the payment is done.
    pub return_url: String,
    pub description: String,
    pub order_id: i64,
}

/// The gateway's view of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    /// Present on freshly created redirect payments.
    pub confirmation_url: Option<String>,
}

impl GatewayPayment {
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }
}

/// The two payment gateway calls the order flows depend on.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<GatewayPayment, GatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError>;
}
