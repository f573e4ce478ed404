use crate::error::DbError;
use crate::migrations;
use crate::registry::PgRegistry;
use core_types::TenantId;

const SCHEMA_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)";

/// SQLSTATEs PostgreSQL reports when a concurrent `CREATE SCHEMA` won the race.
const DUPLICATE_SCHEMA: &str = "42P06";
const UNIQUE_VIOLATION: &str = "23505";

/// Creates and drops tenant schemas.
///
/// DDL runs through the administrative `public` handle; table setup then runs
/// through the new tenant's own handle from the registry.
#[derive(Clone)]
pub struct SchemaManager {
    registry: PgRegistry,
}

impl SchemaManager {
    pub fn new(registry: PgRegistry) -> Self {
        Self { registry }
    }

    /// Creates the tenant's schema and its tables.
    ///
    /// The existence check and `CREATE SCHEMA` share a transaction. If table
    /// setup fails afterwards the schema is left in place and the error is
    /// returned; running `migrate` again completes it.
    pub async fn provision(&self, tenant: &TenantId) -> Result<(), DbError> {
        if tenant.is_reserved() {
            return Err(DbError::ReservedSchema(tenant.to_string()));
        }

        let admin = self.registry.get_handle(&TenantId::public()).await?;
        let mut tx = admin.begin().await?;

        let exists: bool = sqlx::query_scalar(SCHEMA_EXISTS)
            .bind(tenant.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if exists {
            tx.rollback().await?;
            return Err(DbError::AlreadyExists(tenant.to_string()));
        }

        sqlx::query(&format!("CREATE SCHEMA {}", tenant.quoted()))
            .execute(&mut *tx)
            .await
            .map_err(|e| classify_create_error(e, tenant))?;
        tx.commit().await.map_err(|e| classify_create_error(e, tenant))?;
        tracing::info!(tenant = %tenant, "Created tenant schema.");

        if let Err(e) = self.migrate(tenant).await {
            tracing::error!(
                tenant = %tenant,
                error = ?e,
                "Schema was created but table setup did not finish; operator action required."
            );
            return Err(e);
        }

        Ok(())
    }

    /// Runs table setup for an existing tenant schema. Idempotent.
    pub async fn migrate(&self, tenant: &TenantId) -> Result<(), DbError> {
        let pool = self.registry.get_handle(tenant).await?;
        migrations::run(&pool).await?;
        tracing::info!(tenant = %tenant, "Tenant tables are up to date.");
        Ok(())
    }

    /// Drops the tenant's schema with everything in it. Succeeds when the
    /// schema does not exist.
    ///
    /// The tenant's registry entry is evicted first, which also stops its
    /// keep-alive task.
    pub async fn decommission(&self, tenant: &TenantId) -> Result<(), DbError> {
        if tenant.is_reserved() {
            return Err(DbError::ReservedSchema(tenant.to_string()));
        }

        self.registry.evict(tenant).await;

        let admin = self.registry.get_handle(&TenantId::public()).await?;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", tenant.quoted()))
            .execute(&admin)
            .await?;

        tracing::info!(tenant = %tenant, "Dropped tenant schema.");
        Ok(())
    }
}

fn classify_create_error(err: sqlx::Error, tenant: &TenantId) -> DbError {
    let lost_race = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == DUPLICATE_SCHEMA || code == UNIQUE_VIOLATION);

    if lost_race {
        DbError::AlreadyExists(tenant.to_string())
    } else {
        DbError::Query(err)
    }
}
