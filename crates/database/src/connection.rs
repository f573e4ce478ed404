use crate::error::DbError;
use async_trait::async_trait;
use configuration::{DatabaseSettings, PoolSettings, SslMode};
use core_types::TenantId;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

const SCHEMA_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)";

/// Opens and checks the physical handles the tenant registry hands out.
///
/// The registry only deals with this trait, so its locking and keep-alive
/// logic works the same against PostgreSQL and against test doubles.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// A cheaply clonable handle. Clones share the underlying connections.
    type Handle: Clone + Send + Sync + 'static;

    /// Opens a handle whose sessions resolve unqualified names in `tenant`'s
    /// schema. Fails with `DbError::SchemaNotFound` when the schema is absent.
    async fn open(&self, tenant: &TenantId) -> Result<Self::Handle, DbError>;

    /// Round-trips to the server through `handle`.
    async fn ping(&self, handle: &Self::Handle) -> Result<(), DbError>;

    /// Releases the handle's connections.
    async fn close(&self, handle: Self::Handle);
}

/// Builds the server address and credentials shared by every tenant pool.
pub fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
    let ssl_mode = match settings.ssl_mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
    };

    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .database(&settings.database_name)
        .ssl_mode(ssl_mode)
}

/// The PostgreSQL `Connector`: one `PgPool` per tenant schema.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    time_zone: String,
    pool: PoolSettings,
}

impl PgConnector {
    pub fn new(database: &DatabaseSettings, pool: PoolSettings) -> Self {
        Self {
            options: connect_options(database),
            time_zone: database.time_zone.clone(),
            pool,
        }
    }

    /// Every connection in the pool starts with the tenant's schema as its
    /// `search_path`, so queries never need to qualify table names.
    fn tenant_options(&self, tenant: &TenantId) -> PgConnectOptions {
        self.options.clone().options([
            ("search_path", tenant.as_str()),
            ("TimeZone", self.time_zone.as_str()),
        ])
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.pool.max_connections)
            .min_connections(self.pool.min_connections)
            .max_lifetime(self.pool.max_lifetime())
            .acquire_timeout(self.pool.acquire_timeout())
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgPool;

    async fn open(&self, tenant: &TenantId) -> Result<PgPool, DbError> {
        let pool = self
            .pool_options()
            .connect_with(self.tenant_options(tenant))
            .await
            .map_err(DbError::Connection)?;

        let exists: bool = sqlx::query_scalar(SCHEMA_EXISTS)
            .bind(tenant.as_str())
            .fetch_one(&pool)
            .await
            .map_err(DbError::Connection)?;

        if !exists {
            pool.close().await;
            return Err(DbError::SchemaNotFound(tenant.to_string()));
        }

        tracing::debug!(tenant = %tenant, "Connected to tenant schema.");
        Ok(pool)
    }

    async fn ping(&self, handle: &PgPool) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(handle)
            .await
            .map_err(DbError::Connection)?;
        Ok(())
    }

    async fn close(&self, handle: PgPool) {
        handle.close().await;
    }
}
