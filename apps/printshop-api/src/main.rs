//! # PrintShop API Server
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load configuration (defaults → printshop.toml → PRINTSHOP_*)       │
//! │  2. Initialize tracing (text or JSON lines)                             │
//! │  3. Open SQLite and run migrations                                      │
//! │  4. Build the router and bind the listener                              │
//! │  5. Serve until Ctrl+C / SIGTERM, then close the pool                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use printshop_api::{build_router, ApiConfig, AppState};
use printshop_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("Failed to load configuration")?;
    init_tracing(config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_path,
        "Starting PrintShop API"
    );
    if config.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set PRINTSHOP_JWT_SECRET");
    }

    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    let addr = config.bind_address();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Sets up the global subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,printshop=debug,sqlx=warn"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
