//! Repository endpoints
//!
//! - `GET /repos`, `GET /repos/:user`
//! - `POST /repos?name=<n>&...`
//! - `DELETE /repos/:owner/:repo`

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Map, Value};

use super::invoke;
use super::reply::{ApiMessage, Outcome, Reply, unexpected};
use crate::AppState;
use crate::auth::UpstreamToken;
use crate::error::AppError;
use crate::github::{GitHubRepo, RateLimit, UpstreamRequest, UpstreamResponse, segment};

// =============================================================================
// List
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListReposOutcome {
    Listed(Vec<GitHubRepo>),
    NotModified,
    InvalidToken,
    RateLimited(StatusCode, RateLimit),
    UserNotFound,
    ValidationFailed,
    Unexpected(StatusCode),
}

impl ListReposOutcome {
    pub fn classify(response: &UpstreamResponse) -> Result<Self, AppError> {
        Ok(match response.status {
            StatusCode::OK => ListReposOutcome::Listed(response.json()?),
            StatusCode::NOT_MODIFIED => ListReposOutcome::NotModified,
            StatusCode::UNAUTHORIZED => ListReposOutcome::InvalidToken,
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                ListReposOutcome::RateLimited(status, response.rate_limit())
            }
            StatusCode::NOT_FOUND => ListReposOutcome::UserNotFound,
            StatusCode::UNPROCESSABLE_ENTITY => ListReposOutcome::ValidationFailed,
            status => ListReposOutcome::Unexpected(status),
        })
    }
}

impl Outcome for ListReposOutcome {
    type Record = Vec<GitHubRepo>;

    fn into_reply(self) -> Reply<Vec<GitHubRepo>> {
        match self {
            ListReposOutcome::Listed(repos) => Reply::Record(StatusCode::OK, repos),
            ListReposOutcome::NotModified => {
                Reply::message(StatusCode::NOT_MODIFIED, "Not modified")
            }
            ListReposOutcome::InvalidToken => {
                Reply::message(StatusCode::UNAUTHORIZED, "Invalid token")
            }
            ListReposOutcome::RateLimited(status, limit) => Reply::message(status, limit.message()),
            ListReposOutcome::UserNotFound => Reply::message(StatusCode::NOT_FOUND, "User not found"),
            ListReposOutcome::ValidationFailed => {
                Reply::message(StatusCode::UNPROCESSABLE_ENTITY, "Validation failed")
            }
            ListReposOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            ListReposOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

/// GET /repos
///
/// Repositories of the authenticated user.
pub async fn list_own_repositories(
    State(state): State<AppState>,
    token: UpstreamToken,
    headers: HeaderMap,
) -> Result<Reply<Vec<GitHubRepo>>, AppError> {
    let request = UpstreamRequest::get("/user/repos").conditional_on(&headers);
    list_repositories(&state, &token, request).await
}

/// GET /repos/:user
///
/// Public repositories of `user`.
pub async fn list_user_repositories(
    State(state): State<AppState>,
    token: UpstreamToken,
    headers: HeaderMap,
    Path(user): Path<String>,
) -> Result<Reply<Vec<GitHubRepo>>, AppError> {
    let request = UpstreamRequest::get(format!("/users/{}/repos", segment(&user)))
        .conditional_on(&headers);
    list_repositories(&state, &token, request).await
}

async fn list_repositories(
    state: &AppState,
    token: &UpstreamToken,
    request: UpstreamRequest,
) -> Result<Reply<Vec<GitHubRepo>>, AppError> {
    let outcome = invoke(
        state,
        token.secret(),
        "list_repositories",
        request,
        ListReposOutcome::classify,
    )
    .await?;

    Ok(outcome.into_reply())
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRepoOutcome {
    Created(GitHubRepo),
    NotModified,
    BadRequest,
    InvalidToken,
    RateLimited(StatusCode, RateLimit),
    NotFound,
    AlreadyExists,
    Unexpected(StatusCode),
}

impl CreateRepoOutcome {
    pub fn classify(response: &UpstreamResponse) -> Result<Self, AppError> {
        Ok(match response.status {
            StatusCode::CREATED => CreateRepoOutcome::Created(response.json()?),
            StatusCode::NOT_MODIFIED => CreateRepoOutcome::NotModified,
            StatusCode::BAD_REQUEST => CreateRepoOutcome::BadRequest,
            StatusCode::UNAUTHORIZED => CreateRepoOutcome::InvalidToken,
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                CreateRepoOutcome::RateLimited(status, response.rate_limit())
            }
            StatusCode::NOT_FOUND => CreateRepoOutcome::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => CreateRepoOutcome::AlreadyExists,
            status => CreateRepoOutcome::Unexpected(status),
        })
    }
}

impl Outcome for CreateRepoOutcome {
    type Record = GitHubRepo;

    fn into_reply(self) -> Reply<GitHubRepo> {
        match self {
            CreateRepoOutcome::Created(repo) => Reply::Record(StatusCode::CREATED, repo),
            CreateRepoOutcome::NotModified => {
                Reply::message(StatusCode::NOT_MODIFIED, "Not modified")
            }
            CreateRepoOutcome::BadRequest => Reply::message(StatusCode::BAD_REQUEST, "Bad request"),
            CreateRepoOutcome::InvalidToken => {
                Reply::message(StatusCode::UNAUTHORIZED, "Invalid token")
            }
            CreateRepoOutcome::RateLimited(status, limit) => {
                Reply::message(status, limit.message())
            }
            CreateRepoOutcome::NotFound => {
                Reply::message(StatusCode::NOT_FOUND, "Resource not found")
            }
            CreateRepoOutcome::AlreadyExists => {
                Reply::message(StatusCode::UNPROCESSABLE_ENTITY, "Repo already exists")
            }
            CreateRepoOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            CreateRepoOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

/// Coerce a query value for the GitHub request body
///
/// Integer first, then boolean, otherwise the string as given.
pub fn coerce_query_value(value: &str) -> Value {
    if let Ok(number) = value.parse::<i64>() {
        return Value::from(number);
    }
    match value {
        "t" | "T" | "true" | "TRUE" | "True" => Value::Bool(true),
        "f" | "F" | "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(value.to_owned()),
    }
}

/// Build the repository-creation body from every query parameter
///
/// `name` is required, must be non-empty, and always stays a string.
pub fn creation_body(params: Vec<(String, String)>) -> Result<Value, AppError> {
    let mut body = Map::new();
    let mut name = None;

    for (key, value) in params {
        if key == "name" {
            name = Some(value);
        } else {
            body.insert(key, coerce_query_value(&value));
        }
    }

    let name = name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing name parameter".to_string()))?;
    body.insert("name".to_string(), Value::String(name));

    Ok(Value::Object(body))
}

/// POST /repos?name=<n>&<other repository fields>
pub async fn create_repository(
    State(state): State<AppState>,
    token: UpstreamToken,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Reply<GitHubRepo>, AppError> {
    let body = creation_body(params)?;

    let outcome = invoke(
        &state,
        token.secret(),
        "create_repository",
        UpstreamRequest::post("/user/repos", body),
        CreateRepoOutcome::classify,
    )
    .await?;

    if let CreateRepoOutcome::Created(repo) = &outcome {
        tracing::info!(full_name = %repo.full_name, "Repository created");
    }

    Ok(outcome.into_reply())
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteRepoOutcome {
    Deleted { repo: String },
    TemporaryRedirect,
    InvalidToken,
    NotAuthorized,
    RateLimited(StatusCode, RateLimit),
    NotFound,
    Unexpected(StatusCode),
}

impl DeleteRepoOutcome {
    /// A 403 only means "not yours" while quota remains; with the quota
    /// exhausted (or unknown) it is reported as a rate-limit event.
    pub fn classify(response: &UpstreamResponse, repo: &str) -> Self {
        match response.status {
            StatusCode::NO_CONTENT => DeleteRepoOutcome::Deleted {
                repo: repo.to_owned(),
            },
            StatusCode::TEMPORARY_REDIRECT => DeleteRepoOutcome::TemporaryRedirect,
            StatusCode::UNAUTHORIZED => DeleteRepoOutcome::InvalidToken,
            StatusCode::FORBIDDEN => {
                let limit = response.rate_limit();
                if limit.has_quota() {
                    DeleteRepoOutcome::NotAuthorized
                } else {
                    DeleteRepoOutcome::RateLimited(StatusCode::FORBIDDEN, limit)
                }
            }
            StatusCode::TOO_MANY_REQUESTS => {
                DeleteRepoOutcome::RateLimited(StatusCode::TOO_MANY_REQUESTS, response.rate_limit())
            }
            StatusCode::NOT_FOUND => DeleteRepoOutcome::NotFound,
            status => DeleteRepoOutcome::Unexpected(status),
        }
    }
}

impl Outcome for DeleteRepoOutcome {
    type Record = ApiMessage;

    fn into_reply(self) -> Reply<ApiMessage> {
        match self {
            DeleteRepoOutcome::Deleted { repo } => {
                Reply::message(StatusCode::OK, format!("Deleted {repo}"))
            }
            DeleteRepoOutcome::TemporaryRedirect => {
                Reply::message(StatusCode::TEMPORARY_REDIRECT, "Temporary redirect")
            }
            DeleteRepoOutcome::InvalidToken => {
                Reply::message(StatusCode::UNAUTHORIZED, "Invalid token")
            }
            DeleteRepoOutcome::NotAuthorized => {
                Reply::message(StatusCode::FORBIDDEN, "Not authorized")
            }
            DeleteRepoOutcome::RateLimited(status, limit) => {
                Reply::message(status, limit.message())
            }
            DeleteRepoOutcome::NotFound => Reply::message(StatusCode::NOT_FOUND, "Repo not found"),
            DeleteRepoOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            DeleteRepoOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

/// DELETE /repos/:owner/:repo
pub async fn delete_repository(
    State(state): State<AppState>,
    token: UpstreamToken,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Reply<ApiMessage>, AppError> {
    let request = UpstreamRequest::delete(format!("/repos/{}/{}", segment(&owner), segment(&repo)));

    let outcome = invoke(&state, token.secret(), "delete_repository", request, |response| {
        Ok(DeleteRepoOutcome::classify(response, &repo))
    })
    .await?;

    if let DeleteRepoOutcome::Deleted { repo } = &outcome {
        tracing::info!(%owner, %repo, "Repository deleted");
    }

    Ok(outcome.into_reply())
}
