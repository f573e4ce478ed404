use crate::error::ServiceError;
use crate::gateway::{CreatePaymentRequest, PaymentGateway};
use crate::store::OrderStore;
use configuration::PaymentSettings;
use core_types::{DeliveryStatus, NewOrder, Order, PaymentStatus, TenantId, parse_product_ids};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: i64,
    /// Comma-separated product ids, e.g. `"3,17,42"`.
    #[serde(default)]
    pub product_ids: Option<String>,
    pub delivery_address: String,
    pub total_price: Decimal,
    pub addresses_shop_id: i64,
    /// Generated when absent or blank.
    #[serde(default)]
    pub payment_key: Option<String>,
    /// Accepted for compatibility and ignored.
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    /// Accepted for compatibility and ignored.
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// The outcome of a checkout: a stored order with a gateway payment attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub order_id: i64,
    pub payment_key: String,
    pub payment_id: String,
    /// Where to send the customer to pay.
    pub confirmation_url: Option<String>,
}

/// Order operations on top of an `OrderStore`.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
    payment: PaymentSettings,
}

impl<S: OrderStore> OrderService<S> {
    pub fn new(store: S, payment: PaymentSettings) -> Self {
        Self { store, payment }
    }

    /// Validates the request and stores it as a new order.
    ///
    /// New orders always start as `WaitingProcessing` / `WaitingPayment`,
    /// whatever statuses the caller sent.
    pub async fn create_order(&self, request: CreateOrderRequest, tenant: &TenantId) -> Result<i64, ServiceError> {
        let order = prepare(request)?;
        let id = self.store.create_order(&order, tenant).await?;
        Ok(id)
    }

    /// Creates the order and registers a redirect payment for it.
    ///
    /// A gateway failure after the order was stored leaves the order in
    /// place without a payment id.
    pub async fn checkout(
        &self,
        request: CreateOrderRequest,
        tenant: &TenantId,
        gateway: &dyn PaymentGateway,
    ) -> Result<Checkout, ServiceError> {
        let order = prepare(request)?;
        let order_id = self.store.create_order(&order, tenant).await?;

        let payment_request = CreatePaymentRequest {
            amount: format!("{:.2}", order.total_price.round_dp(2)),
            currency: self.payment.currency.clone(),
            return_url: self.return_url(&order.payment_key, tenant),
            description: order.delivery_address.clone(),
            order_id,
        };
        let payment = gateway.create_payment(&payment_request).await.map_err(|e| {
            tracing::warn!(tenant = %tenant, order_id, error = %e, "Order stored but payment was not created.");
            e
        })?;

        self.store.set_payment_id(order_id, &payment.id, tenant).await?;
        tracing::info!(tenant = %tenant, order_id, payment_id = %payment.id, "Checkout started.");

        Ok(Checkout {
            order_id,
            payment_key: order.payment_key,
            payment_id: payment.id,
            confirmation_url: payment.confirmation_url,
        })
    }

    /// Handles the customer coming back from the gateway.
    ///
    /// Marks the order paid when the gateway reports the payment as
    /// succeeded, and returns whether it did. An order without a gateway
    /// payment id is reported as unpaid without asking the gateway.
    pub async fn confirm_redirect(
        &self,
        payment_key: &str,
        tenant: &TenantId,
        gateway: &dyn PaymentGateway,
    ) -> Result<bool, ServiceError> {
        let order = self.store.get_order_by_payment_key(payment_key, tenant).await?;
        let Some(payment_id) = order.payment_id.as_deref() else {
            tracing::debug!(tenant = %tenant, order_id = order.id, "Redirect for an order without a payment.");
            return Ok(false);
        };

        let payment = gateway.get_payment(payment_id).await?;
        if !payment.is_succeeded() {
            tracing::debug!(tenant = %tenant, order_id = order.id, status = %payment.status, "Payment not completed yet.");
            return Ok(false);
        }

        self.store.mark_payment_success(order.id, tenant).await?;
        tracing::info!(tenant = %tenant, order_id = order.id, "Payment confirmed.");
        Ok(true)
    }

    pub async fn take_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), ServiceError> {
        Ok(self.store.take_order_by_courier(courier_id, order_id, tenant).await?)
    }

    pub async fn deliver_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), ServiceError> {
        Ok(self.store.deliver_order_by_courier(courier_id, order_id, tenant).await?)
    }

    pub async fn mark_payment_success(&self, order_id: i64, tenant: &TenantId) -> Result<(), ServiceError> {
        Ok(self.store.mark_payment_success(order_id, tenant).await?)
    }

    pub async fn set_payment_id(&self, order_id: i64, payment_id: &str, tenant: &TenantId) -> Result<(), ServiceError> {
        Ok(self.store.set_payment_id(order_id, payment_id, tenant).await?)
    }

    pub async fn get_order(&self, user_id: i64, order_id: i64, tenant: &TenantId) -> Result<Order, ServiceError> {
        Ok(self.store.get_order(user_id, order_id, tenant).await?)
    }

    pub async fn get_order_by_payment_key(&self, payment_key: &str, tenant: &TenantId) -> Result<Order, ServiceError> {
        Ok(self.store.get_order_by_payment_key(payment_key, tenant).await?)
    }

    pub async fn list_orders_by_user(&self, user_id: i64, tenant: &TenantId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_orders_by_user(user_id, tenant).await?)
    }

    pub async fn list_orders_for_courier(&self, courier_id: i64, tenant: &TenantId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_orders_for_courier(courier_id, tenant).await?)
    }

    pub async fn list_unaccepted_orders_by_shop(
        &self,
        shop_ids: &[i64],
        tenant: &TenantId,
    ) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_unaccepted_orders_by_shop(shop_ids, tenant).await?)
    }

    fn return_url(&self, payment_key: &str, tenant: &TenantId) -> String {
        let base = self.payment.redirect_base_url.trim_end_matches('/');
        format!("{base}/redirect/{payment_key}/{tenant}")
    }
}

fn prepare(request: CreateOrderRequest) -> Result<NewOrder, ServiceError> {
    let product_ids = match request.product_ids.as_deref() {
        Some(raw) => parse_product_ids(raw).map_err(|_| ServiceError::InvalidProductIds(raw.to_string()))?,
        None => Vec::new(),
    };

    let payment_key = request
        .payment_key
        .filter(|key| !key.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(NewOrder {
        user_id: request.user_id,
        product_ids,
        delivery_address: request.delivery_address,
        total_price: request.total_price,
        addresses_shop_id: request.addresses_shop_id,
        payment_key,
        delivery_status: DeliveryStatus::WaitingProcessing,
        payment_status: PaymentStatus::WaitingPayment,
    })
}
