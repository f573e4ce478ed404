//! End-to-end checks against a live PostgreSQL server.
//!
//! Run with the usual settings in the environment, e.g.
//! `ORDERS__DATABASE__HOST=localhost ORDERS__DATABASE__USERNAME=postgres
//! ORDERS__DATABASE__DATABASE_NAME=orders cargo test -p database -- --ignored`

use core_types::{DeliveryStatus, NewOrder, PaymentStatus, TenantId};
use database::{DbError, OrderRepository, PgRegistry, SchemaManager};
use rust_decimal_macros::dec;
use std::time::Duration;

struct Harness {
    registry: PgRegistry,
    schemas: SchemaManager,
    orders: OrderRepository,
}

impl Harness {
    fn new() -> Self {
        let config = configuration::load_config().expect("database settings required");
        let registry = database::registry_from_config(&config);
        Self {
            schemas: SchemaManager::new(registry.clone()),
            orders: OrderRepository::new(registry.clone(), Duration::from_secs(10)),
            registry,
        }
    }

    async fn provisioned_tenant(&self) -> TenantId {
        let tenant = unique_tenant();
        self.schemas.provision(&tenant).await.expect("provision failed");
        tenant
    }
}

fn unique_tenant() -> TenantId {
    TenantId::parse(&format!("test_{}", uuid::Uuid::new_v4().simple())).unwrap()
}

fn new_order(user_id: i64, shop_id: i64, payment_key: &str) -> NewOrder {
    NewOrder {
        user_id,
        product_ids: vec![4, 8, 15],
        delivery_address: "Nevsky prospekt 28".to_string(),
        total_price: dec!(1299.90),
        addresses_shop_id: shop_id,
        payment_key: payment_key.to_string(),
        delivery_status: DeliveryStatus::WaitingProcessing,
        payment_status: PaymentStatus::WaitingPayment,
    }
}

async fn lookup_codes(harness: &Harness, tenant: &TenantId, table: &str) -> Vec<String> {
    let pool = harness.registry.get_handle(tenant).await.unwrap();
    sqlx::query_scalar(&format!("SELECT code FROM {table} ORDER BY id"))
        .fetch_all(&pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn provision_seeds_lookup_tables_exactly_once() {
    let harness = Harness::new();
    let tenant = harness.provisioned_tenant().await;

    let payment = lookup_codes(&harness, &tenant, "payment_status").await;
    let delivery = lookup_codes(&harness, &tenant, "delivery_status").await;
    assert_eq!(payment, ["WaitingPayment", "Paid", "Canceled"]);
    assert_eq!(delivery, ["WaitingProcessing", "ProcessOfDelivery", "Delivered", "WaitingPayment"]);

    harness.schemas.migrate(&tenant).await.unwrap();
    harness.schemas.migrate(&tenant).await.unwrap();
    assert_eq!(lookup_codes(&harness, &tenant, "payment_status").await.len(), 3);
    assert_eq!(lookup_codes(&harness, &tenant, "delivery_status").await.len(), 4);

    harness.schemas.decommission(&tenant).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn provisioning_an_existing_tenant_fails() {
    let harness = Harness::new();
    let tenant = harness.provisioned_tenant().await;

    let err = harness.schemas.provision(&tenant).await.unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists(ref name) if name == tenant.as_str()));

    harness.schemas.decommission(&tenant).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn decommissioning_an_unknown_tenant_succeeds() {
    let harness = Harness::new();
    harness.schemas.decommission(&unique_tenant()).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_schema_becomes_available_after_provisioning() {
    let harness = Harness::new();
    let tenant = unique_tenant();

    let err = harness.registry.get_handle(&tenant).await.unwrap_err();
    assert!(matches!(err, DbError::SchemaNotFound(_)));
    assert!(!harness.registry.contains(&tenant));

    let err = harness.orders.list_unaccepted_orders_by_shop(&[], &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::SchemaNotFound(_)));

    harness.schemas.provision(&tenant).await.unwrap();
    harness.registry.get_handle(&tenant).await.unwrap();
    assert!(harness.orders.list_unaccepted_orders_by_shop(&[], &tenant).await.unwrap().is_empty());
    assert!(harness.registry.contains(&tenant));

    harness.schemas.decommission(&tenant).await.unwrap();
    assert!(!harness.registry.contains(&tenant));
}

#[tokio::test]
#[ignore = "requires database"]
async fn courier_takes_and_delivers_an_order() {
    let harness = Harness::new();
    let tenant = harness.provisioned_tenant().await;
    let orders = &harness.orders;

    let order_id = orders.create_order(&new_order(1, 100, "key-a"), &tenant).await.unwrap();
    assert_eq!(orders.list_unaccepted_orders_by_shop(&[100, 200], &tenant).await.unwrap().len(), 1);

    orders.take_order_by_courier(5, order_id, &tenant).await.unwrap();
    let taken = orders.get_order(1, order_id, &tenant).await.unwrap();
    assert_eq!(taken.courier_id, Some(5));
    assert_eq!(taken.delivery_status, DeliveryStatus::ProcessOfDelivery);
    assert_eq!(orders.list_orders_for_courier(5, &tenant).await.unwrap().len(), 1);
    assert!(orders.list_unaccepted_orders_by_shop(&[100], &tenant).await.unwrap().is_empty());

    let err = orders.take_order_by_courier(5, 999, &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::TakeOrderNotFound(999)));

    let err = orders.deliver_order_by_courier(6, order_id, &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::OrderCourierMismatch { courier_id: 6, .. }));

    orders.deliver_order_by_courier(5, order_id, &tenant).await.unwrap();
    let delivered = orders.get_order(1, order_id, &tenant).await.unwrap();
    assert_eq!(delivered.delivery_status, DeliveryStatus::Delivered);
    assert!(orders.list_orders_for_courier(5, &tenant).await.unwrap().is_empty());

    harness.schemas.decommission(&tenant).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn payment_key_lookup_and_payment_success() {
    let harness = Harness::new();
    let tenant = harness.provisioned_tenant().await;
    let orders = &harness.orders;

    let order_id = orders.create_order(&new_order(2, 100, "key-b"), &tenant).await.unwrap();

    let err = orders.get_order_by_payment_key("nope", &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::PaymentKeyNotFound(_)));

    let found = orders.get_order_by_payment_key("key-b", &tenant).await.unwrap();
    assert_eq!(found.id, order_id);
    assert_eq!(found.total_price, dec!(1299.90));
    assert_eq!(found.product_ids, vec![4, 8, 15]);

    orders.set_payment_id(order_id, "gw-1", &tenant).await.unwrap();
    let err = orders.set_payment_id(999, "gw-2", &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::PaymentIdUpdateNotFound(999)));

    orders.mark_payment_success(order_id, &tenant).await.unwrap();
    orders.mark_payment_success(order_id, &tenant).await.unwrap();
    let paid = orders.get_order(2, order_id, &tenant).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.delivery_status, DeliveryStatus::WaitingProcessing);
    assert_eq!(paid.payment_id.as_deref(), Some("gw-1"));

    let err = orders.create_order(&new_order(3, 100, "key-b"), &tenant).await.unwrap_err();
    assert!(matches!(err, DbError::DuplicatePaymentKey(_)));

    harness.schemas.decommission(&tenant).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn reads_are_scoped_to_the_owner_and_tenant() {
    let harness = Harness::new();
    let first = harness.provisioned_tenant().await;
    let second = harness.provisioned_tenant().await;
    let orders = &harness.orders;

    let order_id = orders.create_order(&new_order(1, 100, "key-c"), &first).await.unwrap();

    let err = orders.get_order(42, order_id, &first).await.unwrap_err();
    assert!(matches!(err, DbError::OrderNotFound(_)));
    assert!(orders.get_order(1, order_id, &second).await.is_err());
    assert!(orders.list_orders_by_user(1, &second).await.unwrap().is_empty());
    assert_eq!(orders.list_orders_by_user(1, &first).await.unwrap().len(), 1);

    harness.schemas.decommission(&first).await.unwrap();
    harness.schemas.decommission(&second).await.unwrap();
}
