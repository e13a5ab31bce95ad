//! Cambio API Server Binary
//!
//! Wires the rate sources, the Postgres-backed store, and the quote cache
//! behind the HTTP surface.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cambio_server::config::ServerConfig;
use cambio_server::handlers::AppState;
use cambio_server::router::build_router;
use cambio_service::{PgQuoteStore, QuoteCache};
use cambio_sources::{http, SourceRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting cambio API server");

    let config = ServerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("configuration error: {}", e));
    }

    // Failing to reach storage at startup is the one fatal condition.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database.url())
        .await?;
    PgQuoteStore::init_schema(&pool).await?;
    info!(database = %config.database.database, "Database initialized");

    let client = http::build_client()?;
    let registry = Arc::new(SourceRegistry::new(client));
    let store = Arc::new(PgQuoteStore::new(pool));
    let cache = Arc::new(QuoteCache::new(store, registry));

    let app = build_router(AppState { cache });

    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
