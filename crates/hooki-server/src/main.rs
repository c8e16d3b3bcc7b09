//! # hooki-server
//!
//! Backend for the Hooki location-based social app.
//!
//! This binary provides:
//! - **REST API** (axum) for users, posts ("hooks"), matches and
//!   conversation history
//! - **Realtime endpoint** (`/ws`) where each device announces its user and
//!   receives new posts, likes, replies, matches and chat messages
//! - **Message routing** with per-conversation ordering and fan-out to every
//!   device of both participants
//! - **Proximity filtering** of posts and users by great-circle distance
//! - **Per-IP and per-connection rate limiting** to protect against abuse

mod api;
mod config;
mod error;
mod fanout;
mod rate_limit;
mod registry;
mod router;
mod ws;

use std::sync::Arc;

use hooki_store::{MemoryStore, SqliteStore, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hooki_server=debug")),
        )
        .init();

    info!("Starting Hooki server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let store: Arc<dyn Store> = match &config.store_path {
        Some(path) => {
            let store = SqliteStore::open_at(path)?;
            info!(path = ?store.path(), "Using SQLite store");
            Arc::new(store)
        }
        None => {
            info!("STORE_PATH not set, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let http_addr = config.http_addr;
    let app_state = AppState::new(config, store);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = app_state.rate_limiter.clone();
    let ml = app_state.message_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
            ml.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP + WebSocket server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
