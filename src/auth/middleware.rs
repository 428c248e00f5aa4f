//! Authentication middleware
//!
//! Protects routes that require a session.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use secrecy::SecretString;

use super::session::verify_session_token;
use crate::AppState;
use crate::error::AppError;

/// GitHub token of the authenticated caller
///
/// Inserted into request extensions by [`require_auth`]; handlers take it
/// as an extractor.
#[derive(Clone)]
pub struct UpstreamToken(Arc<SecretString>);

impl UpstreamToken {
    pub fn new(token: SecretString) -> Self {
        Self(Arc::new(token))
    }

    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl std::fmt::Debug for UpstreamToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UpstreamToken([REDACTED])")
    }
}

/// Middleware to require authentication
///
/// Reads the session cookie, verifies it, and adds the embedded
/// [`UpstreamToken`] to request extensions. Any failure short-circuits with
/// 401 before the handler (and therefore GitHub) is reached.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/repos", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_name = &state.config.auth.cookie_name;
    let credential = jar
        .get(cookie_name)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| {
            tracing::debug!(path = %request.uri().path(), "No session cookie");
            AppError::Unauthorized
        })?;

    let session = verify_session_token(&credential, &state.config.auth.session_secret)
        .map_err(|error| {
            tracing::debug!(path = %request.uri().path(), %error, "Rejected session cookie");
            AppError::Session(error)
        })?;

    request
        .extensions_mut()
        .insert(UpstreamToken::new(session.upstream_token()));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for UpstreamToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UpstreamToken>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
