//! In-memory doubles for the store and gateway seams.

use crate::error::GatewayError;
use crate::gateway::{CreatePaymentRequest, GatewayPayment, PaymentGateway};
use crate::store::OrderStore;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{DeliveryStatus, NewOrder, Order, PaymentStatus, TenantId};
use database::DbError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Mirrors the repository's conditional-update semantics per tenant.
#[derive(Default)]
pub struct MemoryStore {
    tenants: Mutex<HashMap<TenantId, Vec<Order>>>,
}

impl MemoryStore {
    fn update<F>(&self, tenant: &TenantId, matches: impl Fn(&Order) -> bool, apply: F) -> bool
    where
        F: Fn(&mut Order),
    {
        let mut tenants = self.tenants.lock();
        let orders = tenants.entry(tenant.clone()).or_default();
        let mut touched = false;
        for order in orders.iter_mut().filter(|o| matches(o)) {
            apply(order);
            order.updated_at = Utc::now();
            touched = true;
        }
        touched
    }

    fn select(&self, tenant: &TenantId, matches: impl Fn(&Order) -> bool) -> Vec<Order> {
        let tenants = self.tenants.lock();
        tenants
            .get(tenant)
            .map(|orders| orders.iter().filter(|o| matches(o)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: &NewOrder, tenant: &TenantId) -> Result<i64, DbError> {
        let mut tenants = self.tenants.lock();
        let orders = tenants.entry(tenant.clone()).or_default();
        if orders.iter().any(|o| o.payment_key == order.payment_key) {
            return Err(DbError::DuplicatePaymentKey(order.payment_key.clone()));
        }

        let id = orders.len() as i64 + 1;
        let now = Utc::now();
        orders.push(Order {
            id,
            user_id: order.user_id,
            product_ids: order.product_ids.clone(),
            delivery_address: order.delivery_address.clone(),
            total_price: order.total_price,
            addresses_shop_id: order.addresses_shop_id,
            payment_key: order.payment_key.clone(),
            payment_id: None,
            courier_id: None,
            delivery_status: order.delivery_status,
            payment_status: order.payment_status,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn take_order_by_courier(&self, courier_id: i64, order_id: i64, tenant: &TenantId) -> Result<(), DbError> {
        let touched = self.update(tenant, |o| o.id == order_id, |o| {
            o.courier_id = Some(courier_id);
            o.delivery_status = DeliveryStatus::ProcessOfDelivery;
        });
        touched.then_some(()).ok_or(DbError::TakeOrderNotFound(order_id))
    }

    async fn deliver_order_by_courier(&self, courier_id: i64, order_id: i64, tenant: &TenantId) -> Result<(), DbError> {
        let touched = self.update(
            tenant,
            |o| o.id == order_id && o.courier_id == Some(courier_id),
            |o| o.delivery_status = DeliveryStatus::Delivered,
        );
        touched
            .then_some(())
            .ok_or(DbError::OrderCourierMismatch { courier_id, order_id })
    }

    async fn mark_payment_success(&self, order_id: i64, tenant: &TenantId) -> Result<(), DbError> {
        let touched = self.update(tenant, |o| o.id == order_id, |o| {
            o.payment_status = PaymentStatus::Paid;
            o.delivery_status = DeliveryStatus::WaitingProcessing;
        });
        touched.then_some(()).ok_or(DbError::OrderNotFound(order_id))
    }

    async fn set_payment_id(&self, order_id: i64, payment_id: &str, tenant: &TenantId) -> Result<(), DbError> {
        let touched = self.update(tenant, |o| o.id == order_id, |o| {
            o.payment_id = Some(payment_id.to_string());
        });
        touched.then_some(()).ok_or(DbError::PaymentIdUpdateNotFound(order_id))
    }

    async fn get_order(&self, user_id: i64, order_id: i64, tenant: &TenantId) -> Result<Order, DbError> {
        self.select(tenant, |o| o.id == order_id && o.user_id == user_id)
            .pop()
            .ok_or(DbError::OrderNotFound(order_id))
    }

    async fn get_order_by_payment_key(&self, payment_key: &str, tenant: &TenantId) -> Result<Order, DbError> {
        self.select(tenant, |o| o.payment_key == payment_key)
            .pop()
            .ok_or_else(|| DbError::PaymentKeyNotFound(payment_key.to_string()))
    }

    async fn list_orders_by_user(&self, user_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        Ok(self.select(tenant, |o| o.user_id == user_id))
    }

    async fn list_orders_for_courier(&self, courier_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        Ok(self.select(tenant, |o| {
            o.courier_id == Some(courier_id) && o.delivery_status == DeliveryStatus::ProcessOfDelivery
        }))
    }

    async fn list_unaccepted_orders_by_shop(&self, shop_ids: &[i64], tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        Ok(self.select(tenant, |o| {
            shop_ids.contains(&o.addresses_shop_id) && o.delivery_status == DeliveryStatus::WaitingProcessing
        }))
    }
}

/// A gateway that hands out sequential payment ids, all reporting one status.
pub struct MockGateway {
    status: String,
    fail: bool,
    created: Mutex<Vec<CreatePaymentRequest>>,
    lookups: Mutex<usize>,
}

impl MockGateway {
    pub fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            fail: false,
            created: Mutex::new(Vec::new()),
            lookups: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_status("pending")
        }
    }

    pub fn created(&self) -> Vec<CreatePaymentRequest> {
        self.created.lock().clone()
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }

    fn payment(&self, id: String) -> GatewayPayment {
        GatewayPayment {
            confirmation_url: Some(format!("https://pay.example/{id}")),
            status: self.status.clone(),
            id,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<GatewayPayment, GatewayError> {
        if self.fail {
            return Err(GatewayError("gateway unavailable".to_string()));
        }
        let mut created = self.created.lock();
        created.push(request.clone());
        Ok(self.payment(format!("pay-{}", created.len())))
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError> {
        *self.lookups.lock() += 1;
        Ok(self.payment(payment_id.to_string()))
    }
}
