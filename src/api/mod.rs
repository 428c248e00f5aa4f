//! API layer
//!
//! HTTP handlers for:
//! - Session (authenticate, current user, logout)
//! - Repositories (list, create, delete)
//! - Pull requests
//! - Metrics (Prometheus)

mod auth;
pub mod metrics;
mod pulls;
mod repos;
mod reply;

pub use auth::{AuthOutcome, UserOutcome};
pub use metrics::metrics_router;
pub use pulls::PullsOutcome;
pub use repos::{CreateRepoOutcome, DeleteRepoOutcome, ListReposOutcome, coerce_query_value};
pub use reply::{ApiMessage, Outcome, PrettyJson, Reply, UNEXPECTED_STATUS};

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use secrecy::SecretString;

use crate::AppState;
use crate::auth::require_auth;
use crate::error::AppError;
use crate::github::{UpstreamRequest, UpstreamResponse};
use crate::metrics::RATE_LIMIT_EVENTS_TOTAL;

/// Create the gateway router
///
/// `POST /auth` is public (it is how a session is obtained); every other
/// route sits behind [`require_auth`].
pub fn gateway_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new().route("/auth", post(auth::authenticate));

    let authenticated_routes = Router::new()
        .route("/auth", get(auth::current_user).delete(auth::logout))
        .route(
            "/repos",
            get(repos::list_own_repositories).post(repos::create_repository),
        )
        .route("/repos/:user", get(repos::list_user_repositories))
        .route("/repos/:owner/:repo", delete(repos::delete_repository))
        .route("/pulls/:owner/:repo/:n", get(pulls::list_pull_requests))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(authenticated_routes)
}

/// Call GitHub once and classify the response
///
/// Shared by every handler: sends the request, lets `classify` apply the
/// endpoint's status table, and records rate-limit events.
pub(crate) async fn invoke<O, F>(
    state: &AppState,
    token: &SecretString,
    endpoint: &'static str,
    request: UpstreamRequest,
    classify: F,
) -> Result<O, AppError>
where
    O: Outcome,
    F: FnOnce(&UpstreamResponse) -> Result<O, AppError>,
{
    let response = state.github.send(token, request).await?;
    let outcome = classify(&response)?;

    if let Some(limit) = outcome.rate_limit() {
        RATE_LIMIT_EVENTS_TOTAL.with_label_values(&[endpoint]).inc();
        tracing::warn!(
            endpoint,
            status = %response.status,
            remaining = ?limit.remaining,
            reset = ?limit.reset,
            "GitHub rate limit reached"
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        let config = crate::config::AppConfig {
            server: crate::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            auth: crate::config::AuthConfig {
                session_secret: "unit-test-secret-key-32-bytes-long".to_string(),
                session_max_age: 300,
                cookie_name: "jwt".to_string(),
                secure_cookie: false,
            },
            github: crate::config::GitHubConfig {
                // Nothing listens here; these tests must never reach upstream.
                api_url: "http://127.0.0.1:9".to_string(),
                api_version: "2022-11-28".to_string(),
                user_agent: "ghgate/test".to_string(),
                timeout_seconds: Some(1),
            },
            logging: crate::config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        AppState::new(config).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = crate::build_router(state());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let routes = [
            ("GET", "/auth"),
            ("DELETE", "/auth"),
            ("GET", "/repos"),
            ("GET", "/repos/torvalds"),
            ("POST", "/repos?name=test"),
            ("DELETE", "/repos/octocat/Hello-World"),
            ("GET", "/pulls/torvalds/linux/5"),
        ];

        for (method, uri) in routes {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(request).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(
                body,
                serde_json::json!({"status": 401, "message": "Not authenticated"})
            );
        }
    }

    #[tokio::test]
    async fn garbage_cookie_is_rejected() {
        let request = Request::builder()
            .uri("/repos")
            .header("cookie", "jwt=not-a-credential")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");
    }

    #[tokio::test]
    async fn unreachable_github_is_an_unexpected_error() {
        use crate::auth::{Session, create_session_token};

        let state = state();
        let session = Session::new(
            &SecretString::from("ghp_any".to_string()),
            chrono::Duration::seconds(300),
        );
        let credential =
            create_session_token(&session, &state.config.auth.session_secret).unwrap();

        for (method, uri) in [("GET", "/repos"), ("DELETE", "/repos/octocat/Hello-World")] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("cookie", format!("jwt={credential}"))
                .body(Body::empty())
                .unwrap();
            let response = crate::build_router(state.clone())
                .oneshot(request)
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(
                body,
                serde_json::json!({"status": 500, "message": "Unexpected error"})
            );
        }
    }

    #[tokio::test]
    async fn authenticate_without_token_is_a_bad_request() {
        for uri in ["/auth", "/auth?tkn=test", "/auth?token", "/auth?token="] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                body,
                serde_json::json!({"status": 400, "message": "No token provided"})
            );
        }
    }
}
