//! Projections of GitHub JSON
//!
//! Only the fields the gateway echoes back are kept; everything else in the
//! upstream payload is dropped during deserialization.

use serde::{Deserialize, Serialize};

/// GitHub account (user or organization)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub owner: GitHubUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    /// `None` when the author's account was deleted
    #[serde(default)]
    pub user: Option<GitHubUser>,
}
