//! ghgate - A session-authenticated gateway for the GitHub REST API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Session endpoints (/auth)                                │
//! │  - Repository and pull request endpoints                    │
//! │  - Status translation into {status, message} envelopes      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth Layer                              │
//! │  - HS256 session cookie, no server-side storage             │
//! │  - Middleware injecting the caller's GitHub token           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Upstream Layer                           │
//! │  - GitHub REST client (reqwest)                             │
//! │  - Rate-limit header interpretation                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and per-endpoint status tables
//! - `auth`: Session credentials and authentication middleware
//! - `github`: GitHub client, projected records, rate limits
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Immutable after startup. Nothing here is per-caller: every request
/// carries its own session credential.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// GitHub REST client
    pub github: Arc<github::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the GitHub client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let github = github::GitHubClient::new(&config.github)?;
        tracing::info!(
            api_url = %config.github.api_url,
            api_version = %config.github.api_version,
            "GitHub client initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::gateway_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
