//! GitHub REST API access
//!
//! - `client`: the single upstream call helper
//! - `models`: projected records echoed back to callers
//! - `rate_limit`: rate-limit header parsing and retry messages

pub mod client;
pub mod models;
pub mod rate_limit;

pub use client::{GitHubClient, UpstreamRequest, UpstreamResponse, segment};
pub use models::{GitHubPullRequest, GitHubRepo, GitHubUser};
pub use rate_limit::RateLimit;
