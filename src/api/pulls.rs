//! Pull request endpoint
//!
//! `GET /pulls/:owner/:repo/:n[?state=open|closed|all]`

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use super::invoke;
use super::reply::{Outcome, Reply, unexpected};
use crate::AppState;
use crate::auth::UpstreamToken;
use crate::error::AppError;
use crate::github::{GitHubPullRequest, RateLimit, UpstreamRequest, UpstreamResponse, segment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullsOutcome {
    Listed(Vec<GitHubPullRequest>),
    NotModified,
    InvalidToken,
    RateLimited(StatusCode, RateLimit),
    RepoNotFound,
    Spammed,
    Unexpected(StatusCode),
}

impl PullsOutcome {
    pub fn classify(response: &UpstreamResponse) -> Result<Self, AppError> {
        Ok(match response.status {
            StatusCode::OK => PullsOutcome::Listed(response.json()?),
            StatusCode::NOT_MODIFIED => PullsOutcome::NotModified,
            StatusCode::UNAUTHORIZED => PullsOutcome::InvalidToken,
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                PullsOutcome::RateLimited(status, response.rate_limit())
            }
            StatusCode::NOT_FOUND => PullsOutcome::RepoNotFound,
            StatusCode::UNPROCESSABLE_ENTITY => PullsOutcome::Spammed,
            status => PullsOutcome::Unexpected(status),
        })
    }
}

impl Outcome for PullsOutcome {
    type Record = Vec<GitHubPullRequest>;

    fn into_reply(self) -> Reply<Vec<GitHubPullRequest>> {
        match self {
            PullsOutcome::Listed(pulls) => Reply::Record(StatusCode::OK, pulls),
            PullsOutcome::NotModified => Reply::message(StatusCode::NOT_MODIFIED, "Not modified"),
            PullsOutcome::InvalidToken => Reply::message(StatusCode::UNAUTHORIZED, "Invalid token"),
            PullsOutcome::RateLimited(status, limit) => Reply::message(status, limit.message()),
            PullsOutcome::RepoNotFound => Reply::message(StatusCode::NOT_FOUND, "Repo not found"),
            PullsOutcome::Spammed => Reply::message(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed, or the endpoint has been spammed",
            ),
            PullsOutcome::Unexpected(status) => unexpected(status),
        }
    }

    fn rate_limit(&self) -> Option<&RateLimit> {
        match self {
            PullsOutcome::RateLimited(_, limit) => Some(limit),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PullsQuery {
    pub state: Option<String>,
}

/// Parse the page size from the path; it must be a positive integer
pub fn parse_page_size(raw: &str) -> Result<u32, AppError> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::BadRequest("Invalid number of pull requests".to_string()))
}

pub fn parse_state(raw: Option<&str>) -> Result<Option<&str>, AppError> {
    match raw {
        None => Ok(None),
        Some(state @ ("open" | "closed" | "all")) => Ok(Some(state)),
        Some(_) => Err(AppError::BadRequest("Invalid state".to_string())),
    }
}

/// GET /pulls/:owner/:repo/:n
///
/// At most `n` pull requests of `owner/repo`, newest first as GitHub
/// orders them.
pub async fn list_pull_requests(
    State(state): State<AppState>,
    token: UpstreamToken,
    headers: HeaderMap,
    Path((owner, repo, n)): Path<(String, String, String)>,
    Query(query): Query<PullsQuery>,
) -> Result<Reply<Vec<GitHubPullRequest>>, AppError> {
    let per_page = parse_page_size(&n)?;
    let pr_state = parse_state(query.state.as_deref())?;

    let mut request =
        UpstreamRequest::get(format!("/repos/{}/{}/pulls", segment(&owner), segment(&repo)))
            .query("per_page", per_page)
            .conditional_on(&headers);
    if let Some(pr_state) = pr_state {
        request = request.query("state", pr_state);
    }

    let outcome = invoke(
        &state,
        token.secret(),
        "list_pull_requests",
        request,
        PullsOutcome::classify,
    )
    .await?;

    Ok(outcome.into_reply())
}
