//! Session endpoints
//!
//! - `POST /auth?token=` - prove a GitHub token and receive a session cookie
//! - `GET /auth` - the authenticated GitHub user
//! - `DELETE /auth` - drop the session cookie

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use axum_extra::extract::CookieJar;
use chrono::Duration;
use secrecy::SecretString;

use super::invoke;
use super::reply::{Outcome, Reply, unexpected};
use crate::AppState;
use crate::auth::{Session, UpstreamToken, create_session_token, removal_cookie, session_cookie};
use crate::error::AppError;
use crate::github::{GitHubUser, RateLimit, UpstreamRequest, UpstreamResponse};
use crate::metrics::SESSIONS_ISSUED_TOTAL;

/// Result of proving a token against `GET /user`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(GitHubUser),
    InvalidToken,
    RateLimited(StatusCode, RateLimit),
    Unexpected(StatusCode),
}

impl AuthOutcome {
    pub fn classify(response: &UpstreamResponse) -> Result<Self, AppError> {
        Ok(match response.status {
            StatusCode::OK => AuthOutcome::Authenticated(response.json()?),
            StatusCode::UNAUTHORIZED => AuthOutcome::InvalidToken,
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                AuthOutcome::RateLimited(status, response.rate_limit())
            }
            status => AuthOutcome::Unexpected(status),
        })
    }
}

impl Outcome for AuthOutcome {
    type Record = ();

    fn into_reply(self) -> Reply<()> {
        match self {
            AuthOutcome::Authenticated(user) => {
                Reply::message(StatusCode::OK, format!("Authenticated as {}", user.login))
            }
            AuthOutcome::InvalidToken => Reply::message(StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthOutcome::RateLimited(status, limit) => Reply::message(status, limit.message()),
            AuthOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            AuthOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

/// Result of `GET /user` for an existing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    Found(GitHubUser),
    NotModified,
    InvalidToken,
    RateLimited(StatusCode, RateLimit),
    Unexpected(StatusCode),
}

impl UserOutcome {
    pub fn classify(response: &UpstreamResponse) -> Result<Self, AppError> {
        Ok(match response.status {
            StatusCode::OK => UserOutcome::Found(response.json()?),
            StatusCode::NOT_MODIFIED => UserOutcome::NotModified,
            StatusCode::UNAUTHORIZED => UserOutcome::InvalidToken,
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                UserOutcome::RateLimited(status, response.rate_limit())
            }
            status => UserOutcome::Unexpected(status),
        })
    }
}

impl Outcome for UserOutcome {
    type Record = GitHubUser;

    fn into_reply(self) -> Reply<GitHubUser> {
        match self {
            UserOutcome::Found(user) => Reply::Record(StatusCode::OK, user),
            UserOutcome::NotModified => Reply::message(StatusCode::NOT_MODIFIED, "Not modified"),
            UserOutcome::InvalidToken => Reply::message(StatusCode::UNAUTHORIZED, "Invalid token"),
            UserOutcome::RateLimited(status, limit) => Reply::message(status, limit.message()),
            UserOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            UserOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

/// POST /auth?token=<github token>
///
/// # Steps
/// 1. Reject a missing or empty `token`
/// 2. Prove the token with `GET /user`
/// 3. On success, issue a session credential and set it as a cookie
pub async fn authenticate(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    jar: CookieJar,
) -> Result<(CookieJar, Reply<()>), AppError> {
    let token = params
        .into_iter()
        .rev()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest("No token provided".to_string()))?;
    let token = SecretString::from(token);

    let outcome = invoke(
        &state,
        &token,
        "authenticate",
        UpstreamRequest::get("/user"),
        AuthOutcome::classify,
    )
    .await?;

    let jar = match &outcome {
        AuthOutcome::Authenticated(user) => {
            let auth = &state.config.auth;
            let session = Session::new(&token, Duration::seconds(auth.session_max_age));
            let credential = create_session_token(&session, &auth.session_secret)
                .map_err(|e| AppError::Internal(e.into()))?;
            SESSIONS_ISSUED_TOTAL.inc();
            tracing::info!(login = %user.login, "Session issued");
            jar.add(session_cookie(credential, auth))
        }
        _ => jar,
    };

    Ok((jar, outcome.into_reply()))
}

/// GET /auth
pub async fn current_user(
    State(state): State<AppState>,
    token: UpstreamToken,
    headers: HeaderMap,
) -> Result<Reply<GitHubUser>, AppError> {
    let outcome = invoke(
        &state,
        token.secret(),
        "current_user",
        UpstreamRequest::get("/user").conditional_on(&headers),
        UserOutcome::classify,
    )
    .await?;

    Ok(outcome.into_reply())
}

/// DELETE /auth
///
/// Only clears the cookie. The credential itself stays valid until it
/// expires; there is no server-side revocation list.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Reply<()>) {
    tracing::info!("Session cleared");
    (
        jar.add(removal_cookie(&state.config.auth)),
        Reply::message(StatusCode::OK, "Logged out"),
    )
}
