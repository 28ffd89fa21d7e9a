//! # PDV API Server
//!
//! ```text
//! load config ──► open SQLite (migrations) ──► bind ──► serve until signal
//! ```
//!
//! ## Usage
//! ```bash
//! JWT_SECRET=change-me cargo run -p pdv-api
//!
//! # Explicit config file
//! PDV_CONFIG=/etc/pdv/pdv.toml cargo run -p pdv-api
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pdv_api::auth::JwtManager;
use pdv_api::{build_app, ApiConfig, AppState};
use pdv_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pdv=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting PDV API server...");

    let config = ApiConfig::load(None).context("loading configuration")?;
    info!(
        db_path = %config.db_path.display(),
        addr = %config.listen_addr(),
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.db_path).max_connections(config.max_connections),
    )
    .await
    .with_context(|| format!("opening database at {}", config.db_path.display()))?;
    info!("Database ready");

    let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
    let app = build_app(AppState::new(db.clone(), jwt));

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("binding {}", config.listen_addr()))?;
    info!(addr = %config.listen_addr(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// A handler that fails to install is logged and never fires; the other
/// one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
