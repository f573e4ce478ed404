use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::{Config, SslMode};
use core_types::{Order, TenantId};
use database::{OrderRepository, PgRegistry, SchemaManager};
use orders::OrderService;
use std::path::PathBuf;

/// The main entry point for the tenant order store's operator CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; settings can come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => configuration::load_config_from(path),
        None => configuration::load_config(),
    }
    .context("Failed to load configuration")?;
    if let Some(ssl_mode) = cli.ssl_mode {
        config.database.ssl_mode = ssl_mode;
    }

    let _log_guard = configuration::init_tracing(&config.logging).context("Failed to set up logging")?;

    // Startup is fatal if the administrative schema is unreachable.
    let registry = database::registry_from_config(&config);
    if let Err(e) = registry.get_handle(&TenantId::public()).await {
        tracing::error!(error = ?e, host = %config.database.host, "Failed to connect to the database.");
        return Err(e).context("Failed to connect to the database");
    }
    tracing::info!(host = %config.database.host, database = %config.database.database_name, "Connected to the database.");

    let result = run(cli.command, &config, &registry).await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "Command failed.");
    }

    registry.shutdown().await;
    tracing::debug!("Closed all tenant connections.");
    result
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Operator tool for the schema-per-tenant order store.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load settings from this file instead of ./config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `database.ssl_mode` from the settings.
    #[arg(long, global = true, value_enum)]
    ssl_mode: Option<SslMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a tenant's schema, lookup tables and order table.
    Provision {
        tenant: TenantId,
    },
    /// Bring an existing tenant schema's tables up to date.
    Migrate {
        tenant: TenantId,
    },
    /// Drop a tenant's schema and everything in it.
    Decommission {
        tenant: TenantId,
    },
    /// Open a handle to a tenant schema and run a query through it.
    Check {
        tenant: TenantId,
    },
    /// List a user's orders in a tenant.
    Orders {
        tenant: TenantId,

        #[arg(long)]
        user: i64,
    },
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run(command: Commands, config: &Config, registry: &PgRegistry) -> anyhow::Result<()> {
    let schemas = SchemaManager::new(registry.clone());

    match command {
        Commands::Provision { tenant } => {
            schemas
                .provision(&tenant)
                .await
                .with_context(|| format!("Failed to provision tenant '{tenant}'"))?;
            println!("Provisioned tenant '{tenant}'.");
        }
        Commands::Migrate { tenant } => {
            schemas
                .migrate(&tenant)
                .await
                .with_context(|| format!("Failed to migrate tenant '{tenant}'"))?;
            println!("Tenant '{tenant}' is up to date.");
        }
        Commands::Decommission { tenant } => {
            schemas
                .decommission(&tenant)
                .await
                .with_context(|| format!("Failed to decommission tenant '{tenant}'"))?;
            println!("Decommissioned tenant '{tenant}'.");
        }
        Commands::Check { tenant } => {
            let pool = registry
                .get_handle(&tenant)
                .await
                .with_context(|| format!("Failed to open tenant '{tenant}'"))?;
            let schema: String = sqlx::query_scalar("SELECT current_schema()")
                .fetch_one(&pool)
                .await
                .context("Connectivity check failed")?;
            tracing::info!(tenant = %tenant, schema = %schema, "Connectivity check passed.");
            println!("Tenant '{tenant}' is reachable (current schema: {schema}).");
        }
        Commands::Orders { tenant, user } => {
            let repository = OrderRepository::new(registry.clone(), config.pool.query_timeout());
            let service = OrderService::new(repository, config.payment.clone());
            let orders = service
                .list_orders_by_user(user, &tenant)
                .await
                .with_context(|| format!("Failed to list orders of user {user} in '{tenant}'"))?;
            tracing::info!(tenant = %tenant, user, count = orders.len(), "Listed orders.");
            print_orders(&orders);
        }
    }

    Ok(())
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Products", "Total", "Shop", "Courier", "Delivery", "Payment", "Created",
    ]);

    for order in orders {
        let products = order
            .product_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        table.add_row(vec![
            order.id.to_string(),
            products,
            order.total_price.to_string(),
            order.addresses_shop_id.to_string(),
            order.courier_id.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            order.delivery_status.to_string(),
            order.payment_status.to_string(),
            order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");
}
