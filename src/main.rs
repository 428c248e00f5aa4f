//! ghgate binary entry point

use ghgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize metrics
/// 4. Initialize AppState and build the Axum router
/// 5. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (logging settings live in it)
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let default_filter = format!("ghgate={},tower_http=debug", config.logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting ghgate...");
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        api_url = %config.github.api_url,
        session_max_age = config.auth.session_max_age,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    ghgate::metrics::init_metrics()?;

    // 4. Initialize application state and router
    let addr = config.server.bind_addr();
    let state = AppState::new(config)?;
    let app = ghgate::build_router(state);

    // 5. Start HTTP server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
