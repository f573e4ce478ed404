use crate::error::DbError;
use crate::registry::PgRegistry;
use chrono::{DateTime, Utc};
use core_types::{DeliveryStatus, NewOrder, Order, PaymentStatus, TenantId};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::future::Future;
use std::time::Duration;

/// Prefixes a `WHERE ...` tail with the joined order projection, so every read
/// returns status codes rather than lookup-table ids.
macro_rules! select_orders {
    ($tail:literal) => {
        concat!(
            r#"
            SELECT
                o.id, o.user_id, o.product_ids, o.delivery_address, o.total_price,
                o.addresses_shop_id, o.payment_key, o.payment_id, o.courier_id,
                ds.code AS delivery_status, ps.code AS payment_status,
                o.created_at, o.updated_at
            FROM "order" AS o
            JOIN delivery_status AS ds ON ds.id = o.delivery_status_id
            JOIN payment_status AS ps ON ps.id = o.payment_status_id
            "#,
            $tail
        )
    };
}

const UNIQUE_VIOLATION: &str = "23505";

/// A row of the joined order projection, before status codes are decoded.
#[derive(Debug, Clone, FromRow)]
struct DbOrder {
    id: i64,
    user_id: i64,
    product_ids: Vec<i64>,
    delivery_address: String,
    total_price: Decimal,
    addresses_shop_id: i64,
    payment_key: String,
    payment_id: Option<String>,
    courier_id: Option<i64>,
    delivery_status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbOrder> for Order {
    type Error = DbError;

    fn try_from(row: DbOrder) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            product_ids: row.product_ids,
            delivery_address: row.delivery_address,
            total_price: row.total_price,
            addresses_shop_id: row.addresses_shop_id,
            payment_key: row.payment_key,
            payment_id: row.payment_id,
            courier_id: row.courier_id,
            delivery_status: row.delivery_status.parse()?,
            payment_status: row.payment_status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode_all(rows: Vec<DbOrder>) -> Result<Vec<Order>, DbError> {
    rows.into_iter().map(Order::try_from).collect()
}

/// Tenant-scoped order reads and state transitions.
///
/// Every call resolves the tenant's handle through the registry first. Each
/// transition is a single conditional `UPDATE`; zero affected rows is reported
/// as the operation's not-found kind. There is no row versioning and no
/// multi-statement transaction: concurrent updates to one row are ordered by
/// PostgreSQL's row locks.
#[derive(Clone)]
pub struct OrderRepository {
    registry: PgRegistry,
    query_timeout: Duration,
}

impl OrderRepository {
    pub fn new(registry: PgRegistry, query_timeout: Duration) -> Self {
        Self { registry, query_timeout }
    }

    /// Bounds an operation, handle lookup included, by the query timeout.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        tokio::time::timeout(self.query_timeout, operation)
            .await
            .map_err(|_| DbError::Timeout(self.query_timeout))?
    }

    /// Inserts an order and returns its store-assigned id.
    pub async fn create_order(&self, order: &NewOrder, tenant: &TenantId) -> Result<i64, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO "order" (
                    user_id, product_ids, delivery_address, total_price, addresses_shop_id,
                    payment_key, delivery_status_id, payment_status_id
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6,
                    (SELECT id FROM delivery_status WHERE code = $7),
                    (SELECT id FROM payment_status WHERE code = $8)
                )
                RETURNING id
                "#,
            )
            .bind(order.user_id)
            .bind(order.product_ids.as_slice())
            .bind(&order.delivery_address)
            .bind(order.total_price)
            .bind(order.addresses_shop_id)
            .bind(&order.payment_key)
            .bind(order.delivery_status.code())
            .bind(order.payment_status.code())
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                let duplicate = e
                    .as_database_error()
                    .and_then(|db| db.code())
                    .is_some_and(|code| code == UNIQUE_VIOLATION);
                if duplicate {
                    DbError::DuplicatePaymentKey(order.payment_key.clone())
                } else {
                    DbError::Query(e)
                }
            })?;

            tracing::debug!(tenant = %tenant, order_id = id, "Created order.");
            Ok(id)
        })
        .await
    }

    /// Assigns the courier and moves the order to `ProcessOfDelivery`.
    ///
    /// The order's current courier and status are not checked, so an order
    /// that is already taken is reassigned.
    pub async fn take_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let result = sqlx::query(
                r#"
                UPDATE "order"
                SET courier_id = $1,
                    delivery_status_id = (SELECT id FROM delivery_status WHERE code = $2),
                    updated_at = now()
                WHERE id = $3
                "#,
            )
            .bind(courier_id)
            .bind(DeliveryStatus::ProcessOfDelivery.code())
            .bind(order_id)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::TakeOrderNotFound(order_id));
            }
            tracing::debug!(tenant = %tenant, order_id, courier_id, "Courier took order.");
            Ok(())
        })
        .await
    }

    /// Marks the order `Delivered`, only if `courier_id` is the assigned courier.
    pub async fn deliver_order_by_courier(
        &self,
        courier_id: i64,
        order_id: i64,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let result = sqlx::query(
                r#"
                UPDATE "order"
                SET delivery_status_id = (SELECT id FROM delivery_status WHERE code = $1),
                    updated_at = now()
                WHERE id = $2 AND courier_id = $3
                "#,
            )
            .bind(DeliveryStatus::Delivered.code())
            .bind(order_id)
            .bind(courier_id)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::OrderCourierMismatch { courier_id, order_id });
            }
            tracing::debug!(tenant = %tenant, order_id, courier_id, "Courier delivered order.");
            Ok(())
        })
        .await
    }

    /// Sets `Paid` / `WaitingProcessing` regardless of the previous state,
    /// so repeating it is harmless.
    pub async fn mark_payment_success(&self, order_id: i64, tenant: &TenantId) -> Result<(), DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let result = sqlx::query(
                r#"
                UPDATE "order"
                SET payment_status_id = (SELECT id FROM payment_status WHERE code = $1),
                    delivery_status_id = (SELECT id FROM delivery_status WHERE code = $2),
                    updated_at = now()
                WHERE id = $3
                "#,
            )
            .bind(PaymentStatus::Paid.code())
            .bind(DeliveryStatus::WaitingProcessing.code())
            .bind(order_id)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::OrderNotFound(order_id));
            }
            tracing::debug!(tenant = %tenant, order_id, "Order paid.");
            Ok(())
        })
        .await
    }

    /// Stores the gateway's payment id on the order.
    pub async fn set_payment_id(
        &self,
        order_id: i64,
        payment_id: &str,
        tenant: &TenantId,
    ) -> Result<(), DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let result = sqlx::query(
                r#"UPDATE "order" SET payment_id = $1, updated_at = now() WHERE id = $2"#,
            )
            .bind(payment_id)
            .bind(order_id)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::PaymentIdUpdateNotFound(order_id));
            }
            Ok(())
        })
        .await
    }

    /// Fetches an order that belongs to `user_id`. Another user's order is
    /// reported as not found.
    pub async fn get_order(&self, user_id: i64, order_id: i64, tenant: &TenantId) -> Result<Order, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let row = sqlx::query_as::<_, DbOrder>(select_orders!("WHERE o.user_id = $1 AND o.id = $2"))
                .bind(user_id)
                .bind(order_id)
                .fetch_optional(&pool)
                .await?
                .ok_or(DbError::OrderNotFound(order_id))?;
            row.try_into()
        })
        .await
    }

    pub async fn get_order_by_payment_key(&self, payment_key: &str, tenant: &TenantId) -> Result<Order, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let row = sqlx::query_as::<_, DbOrder>(select_orders!("WHERE o.payment_key = $1"))
                .bind(payment_key)
                .fetch_optional(&pool)
                .await?
                .ok_or_else(|| DbError::PaymentKeyNotFound(payment_key.to_string()))?;
            row.try_into()
        })
        .await
    }

    pub async fn list_orders_by_user(&self, user_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let rows = sqlx::query_as::<_, DbOrder>(select_orders!("WHERE o.user_id = $1 ORDER BY o.id"))
                .bind(user_id)
                .fetch_all(&pool)
                .await?;
            decode_all(rows)
        })
        .await
    }

    /// Orders the courier is currently delivering.
    pub async fn list_orders_for_courier(&self, courier_id: i64, tenant: &TenantId) -> Result<Vec<Order>, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            let rows = sqlx::query_as::<_, DbOrder>(select_orders!(
                "WHERE o.courier_id = $1 AND ds.code = $2 ORDER BY o.id"
            ))
            .bind(courier_id)
            .bind(DeliveryStatus::ProcessOfDelivery.code())
            .fetch_all(&pool)
            .await?;
            decode_all(rows)
        })
        .await
    }

    /// Orders waiting to be picked up from any of the given shop addresses.
    pub async fn list_unaccepted_orders_by_shop(
        &self,
        shop_ids: &[i64],
        tenant: &TenantId,
    ) -> Result<Vec<Order>, DbError> {
        self.bounded(async {
            let pool = self.registry.get_handle(tenant).await?;
            if shop_ids.is_empty() {
                return Ok(Vec::new());
            }
            let rows = sqlx::query_as::<_, DbOrder>(select_orders!(
                "WHERE o.addresses_shop_id = ANY($1) AND ds.code = $2 ORDER BY o.id"
            ))
            .bind(shop_ids)
            .bind(DeliveryStatus::WaitingProcessing.code())
            .fetch_all(&pool)
            .await?;
            decode_all(rows)
        })
        .await
    }
}
