//! GitHub REST API client
//!
//! One request in, one fully-read response out. Status interpretation is
//! left to the caller: any received HTTP status is a successful call here.

use std::time::Instant;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::GitHubConfig;
use crate::error::AppError;
use crate::github::rate_limit::RateLimit;
use crate::metrics::{UPSTREAM_REQUEST_DURATION_SECONDS, UPSTREAM_REQUESTS_TOTAL};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// A single call to make against the GitHub API
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/user/repos`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Cache validators relayed from the caller
    pub conditional: HeaderMap,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            conditional: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Relay the caller's `If-None-Match` and `If-Modified-Since`, so GitHub
    /// can answer 304
    pub fn conditional_on(mut self, incoming: &HeaderMap) -> Self {
        for name in [header::IF_NONE_MATCH, header::IF_MODIFIED_SINCE] {
            if let Some(value) = incoming.get(&name) {
                self.conditional.insert(name, value.clone());
            }
        }
        self
    }
}

/// Response received from GitHub, body already buffered
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body).map_err(|error| {
            tracing::warn!(status = %self.status, %error, "Undecodable upstream body");
            AppError::UpstreamDecode(error)
        })
    }

    pub fn rate_limit(&self) -> RateLimit {
        RateLimit::from_headers(&self.headers)
    }
}

/// Thin wrapper around `reqwest::Client` bound to one GitHub API base URL
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl GitHubClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be constructed
    pub fn new(config: &GitHubConfig) -> Result<Self, AppError> {
        // Redirects are relayed to the caller, never followed
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }
        let http = builder.build().map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request` on behalf of the holder of `token`
    ///
    /// The response body is read to the end before returning, so the
    /// connection goes back to the pool on every path, including callers
    /// that bail out early.
    ///
    /// # Errors
    /// Only transport failures (connect, DNS, TLS, body read) are errors.
    pub async fn send(
        &self,
        token: &SecretString,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, AppError> {
        let method_label = request.method.as_str().to_owned();
        let started = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), self.url_for(&request.path))
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(API_VERSION_HEADER, &self.api_version)
            .bearer_auth(token.expose_secret())
            .headers(request.conditional.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let result = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse::new(status, headers, body))
        }
        .await;

        UPSTREAM_REQUEST_DURATION_SECONDS
            .with_label_values(&[method_label.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                UPSTREAM_REQUESTS_TOTAL
                    .with_label_values(&[method_label.as_str(), response.status.as_str()])
                    .inc();
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = %response.status,
                    "GitHub responded"
                );
                Ok(response)
            }
            Err(error) => {
                UPSTREAM_REQUESTS_TOTAL
                    .with_label_values(&[method_label.as_str(), "error"])
                    .inc();
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    %error,
                    "GitHub request failed"
                );
                Err(AppError::Upstream(error))
            }
        }
    }
}

/// Percent-encode one path segment supplied by the caller
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
