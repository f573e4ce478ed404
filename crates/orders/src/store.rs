use async_trait::async_trait;
use core_types::{NewOrder, Order, TenantId};
use database::{DbError, OrderRepository};

/// The persistence operations the service is built on.
///
/// Every method is scoped to `tenant`, and the error kinds are the
/// repository's: implementations must report missing rows with the same
/// `DbError` variants `OrderRepository` uses.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: &NewOrder, tenant: &TenantId) -> Result<i64, DbError>;

    async fn take_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError>;

    async fn deliver_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError>;

    async fn mark_payment_success(&self, order_id: i64, tenant: &TenantId) -> Result<(), DbError>;

    async fn set_payment_id(
        &self,
        order_id: i64,
        payment_id: &str,
        tenant: &TenantId,
    ) -> Result<(), DbError>;

    async fn get_order(&self, user_id: i64, order_id: i64, tenant: &TenantId) -> Result<Order, DbError>;

    async fn get_order_by_payment_key(&self, payment_key: &str, tenant: &TenantId) -> Result<Order, DbError>;

    async fn list_orders_by_user(&self, user_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError>;

    async fn list_orders_for_courier(&self, courier_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError>;

    async fn list_unaccepted_orders_by_shop(
        &self,
        shop_ids: &[i64],
        tenant: &TenantId,
    ) -> Result<Vec<Order>, DbError>;
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create_order(&self, order: &NewOrder, tenant: &TenantId) -> Result<i64, DbError> {
        OrderRepository::create_order(self, order, tenant).await
    }

    async fn take_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        OrderRepository::take_order_by_courier(self, courier_id, order_id, tenant).await
    }

    async fn deliver_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        OrderRepository::deliver_order_by_courier(self, courier_id, order_id, tenant).await
    }

    async fn mark_payment_success(&self, order_id: i64, tenant: &TenantId) -> Result<(), DbError> {
        OrderRepository::mark_payment_success(self, order_id, tenant).await
    }

    async fn set_payment_id(
        &self,
        order_id: i64,
        payment_id: &str,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        OrderRepository::set_payment_id(self, order_id, payment_id, tenant).await
    }

    async fn get_order(&self, user_id: i64, order_id: i64, tenant: &TenantId) -> Result<Order, DbError> {
        OrderRepository::get_order(self, user_id, order_id, tenant).await
    }

    async fn get_order_by_payment_key(&self, payment_key: &str, tenant: &TenantId) -> Result<Order, DbError> {
        OrderRepository::get_order_by_payment_key(self, payment_key, tenant).await
    }

    async fn list_orders_by_user(&self, user_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        OrderRepository::list_orders_by_user(self, user_id, tenant).await
    }

    async fn list_orders_for_courier(&self, courier_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        OrderRepository::list_orders_for_courier(self, courier_id, tenant).await
    }

    async fn list_unaccepted_orders_by_shop(
        &self,
        shop_ids: &[i64],
        tenant: &TenantId,
    ) -> Result<Vec<Order>, DbError> {
        OrderRepository::list_unaccepted_orders_by_shop(self, shop_ids, tenant).await
    }
}
