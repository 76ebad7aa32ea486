//! dispatchd - background service for user, permission, and session
//! management with transactional outbox event delivery.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dispatch_config::Config;
use dispatch_database::{Database, PoolConfig};
use dispatch_outbox::{HttpPublisher, OutboxNotifier, OutboxRelay, PublisherConfig, RelayConfig};
use dispatch_permission::{PermissionController, SqlitePermissionStore};
use dispatch_user::{NewUserRequest, SqliteUserStore, UserController};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// dispatchd command-line interface.
#[derive(Parser)]
#[command(name = "dispatchd")]
#[command(about = "Dispatch backend services daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "DISPATCH_LOG_LEVEL", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the outbox relay until interrupted
    Serve,
    /// Create an admin user, optionally with initial permissions
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        pass: String,
        /// Permission tags to grant, repeatable
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = Config::from_env().context("load configuration")?;

    match cli.command {
        Some(Commands::CreateAdmin {
            username,
            pass,
            permissions,
        }) => create_admin(&config, username, pass, permissions),
        Some(Commands::Serve) | None => serve(&config).await,
    }
}

/// Run the relay until ctrl-c. The transport layer in front of the
/// controllers binds `serve_addr`; it is deployed separately.
async fn serve(config: &Config) -> anyhow::Result<()> {
    let db = Arc::new(
        Database::open(&config.db_path, PoolConfig::default()).context("open database")?,
    );
    db.health_check().context("database health check")?;

    let publisher = Arc::new(
        HttpPublisher::new(PublisherConfig {
            bridge_url: config.broker_url.clone(),
            auth_token: config.broker_auth_token.clone(),
            ..PublisherConfig::default()
        })
        .context("build broker publisher")?,
    );

    let relay = OutboxRelay::new(RelayConfig::default(), db, publisher);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(serve_addr = %config.serve_addr, "Transport endpoint configured");

    let relay_task = tokio::spawn(async move { relay.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("Shutdown signal received");

    shutdown_tx.send(true).ok();
    relay_task.await.context("join relay task")?;

    Ok(())
}

fn create_admin(
    config: &Config,
    username: String,
    pass: String,
    permissions: Vec<String>,
) -> anyhow::Result<()> {
    let db = Arc::new(
        Database::open(&config.db_path, PoolConfig::default()).context("open database")?,
    );

    let users = UserController::new(
        db.clone(),
        Arc::new(SqliteUserStore),
        Arc::new(OutboxNotifier::new()),
    );
    let user = users
        .create_user(NewUserRequest {
            username,
            first_name: String::new(),
            last_name: String::new(),
            is_admin: true,
            pass,
        })
        .context("create admin user")?;

    if !permissions.is_empty() {
        let controller = PermissionController::new(
            db,
            Arc::new(SqlitePermissionStore),
            Arc::new(OutboxNotifier::new()),
        );
        controller
            .update_permissions_by_user(user.id, permissions)
            .context("grant permissions")?;
    }

    println!("{}", user.id);
    Ok(())
}
