//! Per-tenant table setup.
//!
//! Runs on a handle whose `search_path` is the tenant schema, so every name
//! here resolves inside that schema. Safe to run repeatedly: tables are only
//! created when absent, and lookup rows are only seeded into a table that was
//! created by the same run.

use crate::error::DbError;
use core_types::{DeliveryStatus, PaymentStatus};
use sqlx::{PgConnection, PgPool};

const TABLE_EXISTS: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
    )
"#;

const CREATE_PAYMENT_STATUS: &str = r#"
    CREATE TABLE IF NOT EXISTS payment_status (
        id BIGSERIAL PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_DELIVERY_STATUS: &str = r#"
    CREATE TABLE IF NOT EXISTS delivery_status (
        id BIGSERIAL PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_ORDER: &str = r#"
    CREATE TABLE IF NOT EXISTS "order" (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        product_ids BIGINT[] NOT NULL DEFAULT '{}',
        delivery_address TEXT NOT NULL,
        total_price NUMERIC(14, 2) NOT NULL,
        addresses_shop_id BIGINT NOT NULL,
        payment_key TEXT NOT NULL UNIQUE,
        payment_id TEXT,
        courier_id BIGINT,
        delivery_status_id BIGINT NOT NULL REFERENCES delivery_status (id) ON UPDATE CASCADE,
        payment_status_id BIGINT NOT NULL REFERENCES payment_status (id) ON UPDATE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const ORDER_INDEXES: [&str; 3] = [
    r#"CREATE INDEX IF NOT EXISTS order_user_id_idx ON "order" (user_id)"#,
    r#"CREATE INDEX IF NOT EXISTS order_courier_id_idx ON "order" (courier_id)"#,
    r#"CREATE INDEX IF NOT EXISTS order_shop_status_idx ON "order" (addresses_shop_id, delivery_status_id)"#,
];

/// Creates the lookup and order tables in the handle's schema.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    if !table_exists(&mut tx, "payment_status").await? {
        sqlx::query(CREATE_PAYMENT_STATUS).execute(&mut *tx).await?;
        let rows = PaymentStatus::ALL.map(|s| (s.code(), s.display_name()));
        seed(&mut tx, "payment_status", &rows).await?;
        tracing::debug!("Created and seeded payment_status.");
    }

    if !table_exists(&mut tx, "delivery_status").await? {
        sqlx::query(CREATE_DELIVERY_STATUS).execute(&mut *tx).await?;
        let rows = DeliveryStatus::ALL.map(|s| (s.code(), s.display_name()));
        seed(&mut tx, "delivery_status", &rows).await?;
        tracing::debug!("Created and seeded delivery_status.");
    }

    if !table_exists(&mut tx, "order").await? {
        sqlx::query(CREATE_ORDER).execute(&mut *tx).await?;
        for statement in ORDER_INDEXES {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tracing::debug!("Created order table.");
    }

    tx.commit().await?;
    Ok(())
}

async fn table_exists(conn: &mut PgConnection, table: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar(TABLE_EXISTS)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// Inserts lookup rows in order, so row ids follow the enumeration order.
async fn seed(conn: &mut PgConnection, table: &'static str, rows: &[(&str, &str)]) -> Result<(), DbError> {
    let statement = format!("INSERT INTO {table} (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING");
    for (code, name) in rows {
        sqlx::query(&statement)
            .bind(*code)
            .bind(*name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
