//! # evote-api — Binary Entry Point
//!
//! Parses flags (with environment fallbacks), initializes tracing, connects
//! to Postgres when configured, and starts the Axum server (default port
//! 5000).

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use evote_api::config::ServerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerArgs::parse()
        .into_config()
        .context("invalid configuration")?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::debug!(?config, "configuration loaded");

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = evote_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("database initialization failed")?;

    let port = config.port;
    let state = evote_api::bootstrap::bootstrap(config, db_pool).context("bootstrap failed")?;

    let app = evote_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("eVote API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
