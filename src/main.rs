//! ShopAlly-RS: shopping assistant search backend
//!
//! This is the main entry point for the application.

use anyhow::Result;
use shopally_rs::{
    cache, config, fx,
    network::HttpClient,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting ShopAlly-RS v{}", shopally_rs::VERSION);

    // Load configuration
    let settings = config::load()?;
    info!(
        "Configuration loaded: llm={:?} catalog={:?}",
        settings.llm.provider, settings.catalog.provider
    );

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;
    info!("HTTP client initialized");

    // Shared cache store
    let store = cache::open_store(&settings.cache).await?;
    info!("Cache store initialized: {:?}", settings.cache.backend);

    // Create application state
    let state = AppState::from_settings(settings.clone(), client, store)?;
    info!("Application state initialized");

    if let Some(rates) = state.rates.clone() {
        if settings.fx.warm_interval_secs > 0 {
            fx::spawn_warmer(rates, Duration::from_secs(settings.fx.warm_interval_secs));
        }
    }

    // Create router
    let app = create_router(state);

    // Bind address
    let addr = SocketAddr::new(
        settings.server.bind_address.parse()?,
        settings.server.port,
    );

    info!("Starting server on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
ShopAlly-RS v{}
Shopping assistant search backend

USAGE:
    shopally-rs [OPTIONS]

OPTIONS:
    -h, --help                 Print help information

ENVIRONMENT VARIABLES:
    SHOPALLY_SETTINGS_PATH     Path to settings.yml
    SHOPALLY_PORT              Server port
    SHOPALLY_BIND_ADDRESS      Bind address
    SHOPALLY_RATE_LIMIT        Requests per window and device
    SHOPALLY_RATE_WINDOW_SECS  Rate limit window length
    SHOPALLY_CACHE_BACKEND     memory | redis
    REDIS_URL                  Redis connection URL
    SHOPALLY_LLM_PROVIDER      mock | gemini
    GEMINI_API_KEY             Gemini API key
    SHOPALLY_CATALOG_PROVIDER  mock | aliexpress
    ALIEXPRESS_APP_KEY         AliExpress app key
    ALIEXPRESS_APP_SECRET      AliExpress app secret
    FX_API_URL                 Exchange rate endpoint
    FX_API_KEY                 Exchange rate access key
    RUST_LOG                   Log filter (default: info)
"#,
        shopally_rs::VERSION
    );
}
