//! Retail Insights API - auth gateway server
//!
//! Usage:
//!   retail-insights --bind-addr 0.0.0.0:8000 --auth-db-path retail_insights_auth.db
//!
//! Environment:
//!   JWT_SECRET_KEY - signing secret (required, at least 32 bytes)
//!   JWT_ALGORITHM - HS256 | HS384 | HS512 (default: HS256)
//!   ACCESS_TOKEN_EXPIRE_MINUTES - token TTL (default: 30)
//!   APP_ENV / APP_DEBUG - environment name and debug logging (default: off)
//!   BCRYPT_COST - password hashing cost (default: 12)
//!   ADMIN_USERNAME / ADMIN_EMAIL / ADMIN_PASSWORD - optional first admin

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use retail_insights_auth::{
    api,
    auth::{AuthGateway, AuthState, SqliteUserStore, SystemClock},
    config::DEFAULT_BCRYPT_COST,
    Settings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "retail-insights")]
#[command(about = "Retail Insights API - JWT auth gateway")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: String,

    /// SQLite file holding user accounts
    #[arg(long, env = "AUTH_DB_PATH", default_value = "retail_insights_auth.db")]
    auth_db_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let args = Args::parse();

    let settings = Settings::from_env();
    init_tracing(
        settings
            .as_ref()
            .map(Settings::default_log_filter)
            .unwrap_or("retail_insights_auth=info"),
    );
    let settings = settings.map_err(|e| {
        error!(error = %e, "Refusing to start");
        e
    })?;

    info!(
        app_env = %settings.app_env,
        debug = settings.is_debug,
        token = ?settings.token,
        "Retail Insights API starting"
    );
    if settings.bcrypt_cost < DEFAULT_BCRYPT_COST {
        warn!(
            cost = settings.bcrypt_cost,
            production = settings.is_production(),
            "bcrypt cost below default"
        );
    }

    let auth_db_path = resolve_data_path(&args.auth_db_path);
    let store = Arc::new(SqliteUserStore::new(&auth_db_path)?);
    let gateway = AuthGateway::new(
        store,
        settings.token.clone(),
        settings.bcrypt_cost,
        Arc::new(SystemClock),
    )
    .await?;

    if let Some(admin) = &settings.bootstrap_admin {
        gateway.bootstrap_admin(admin).await?;
    }

    info!(db_path = %auth_db_path.display(), "Authentication initialized");

    let app = api::router(AuthState::new(Arc::new(gateway)));

    let listener = TcpListener::bind(&args.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind_addr))?;
    info!("API server listening on {}", args.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents), then the crate root when run
    // via --manifest-path from elsewhere.
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

/// Relative paths are anchored at the crate root, not the caller's cwd.
fn resolve_data_path(raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(raw)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
