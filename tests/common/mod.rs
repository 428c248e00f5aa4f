//! Common test utilities for E2E tests
//!
//! `TestServer` runs the gateway on an ephemeral port against `FakeGitHub`,
//! an in-process stand-in for the GitHub REST API.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use ghgate::{AppState, config};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Token the fake accepts as belonging to `octocat`
pub const VALID_TOKEN: &str = "ghp_valid_octocat";

/// Token whose quota is exhausted for the next hour
pub const EXHAUSTED_TOKEN: &str = "ghp_exhausted";

/// Entity tag the fake attaches to `GET /user/repos`
pub const REPOS_ETAG: &str = "\"repos-v1\"";

/// Request as observed by the fake GitHub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeGitHubState {
    requests: Mutex<Vec<RecordedRequest>>,
    repos: Mutex<HashSet<String>>,
}

/// In-process fake of the GitHub endpoints the gateway calls
#[derive(Clone)]
pub struct FakeGitHub {
    pub url: String,
    state: Arc<FakeGitHubState>,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let state = Arc::new(FakeGitHubState::default());
        state
            .repos
            .lock()
            .unwrap()
            .insert("Hello-World".to_string());

        let app = Router::new()
            .route("/user", get(user))
            .route("/user/repos", get(own_repos).post(create_repo))
            .route("/users/:user/repos", get(user_repos))
            .route("/repos/:owner/:repo", axum::routing::delete(delete_repo))
            .route("/repos/:owner/:repo/pulls", get(pulls))
            .route(
                "/repositories/:id",
                axum::routing::delete(delete_repo_by_id),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Number of requests GitHub has received so far
    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().unwrap().last().cloned()
    }
}

fn record(
    state: &FakeGitHubState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<Value>,
) {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body,
    });
}

fn github_message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Resolve the bearer token, or the response GitHub would give instead
fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(VALID_TOKEN) => Ok(()),
        Some(EXHAUSTED_TOKEN) => {
            let reset = chrono::Utc::now().timestamp() + 3600;
            let mut response = github_message(StatusCode::FORBIDDEN, "API rate limit exceeded");
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            headers.insert(
                "x-ratelimit-reset",
                HeaderValue::from_str(&reset.to_string()).unwrap(),
            );
            Err(response)
        }
        _ => Err(github_message(StatusCode::UNAUTHORIZED, "Bad credentials")),
    }
}

fn user_json(login: &str) -> Value {
    json!({
        "login": login,
        "id": 1,
        "node_id": "MDQ6VXNlcjE=",
        "url": format!("https://api.github.com/users/{login}"),
        "html_url": format!("https://github.com/{login}"),
        "repos_url": format!("https://api.github.com/users/{login}/repos"),
        "site_admin": false
    })
}

fn repo_json(owner: &str, name: &str) -> Value {
    json!({
        "id": 1296269,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "private": false,
        "html_url": format!("https://github.com/{owner}/{name}"),
        "owner": user_json(owner),
        "stargazers_count": 80
    })
}

async fn user(
    State(state): State<Arc<FakeGitHubState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::GET, &uri, &headers, None);
    if let Err(response) = authorize(&headers) {
        return response;
    }
    Json(user_json("octocat")).into_response()
}

async fn own_repos(
    State(state): State<Arc<FakeGitHubState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::GET, &uri, &headers, None);
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if headers.get("if-none-match").is_some_and(|v| v == REPOS_ETAG) {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    let mut names: Vec<String> = state.repos.lock().unwrap().iter().cloned().collect();
    names.sort();
    let repos: Vec<Value> = names.iter().map(|n| repo_json("octocat", n)).collect();
    let mut response = Json(repos).into_response();
    response
        .headers_mut()
        .insert("etag", HeaderValue::from_static(REPOS_ETAG));
    response
}

async fn user_repos(
    State(state): State<Arc<FakeGitHubState>>,
    Path(user): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::GET, &uri, &headers, None);
    if let Err(response) = authorize(&headers) {
        return response;
    }
    match user.as_str() {
        "torvalds" => Json(vec![
            repo_json("torvalds", "linux"),
            repo_json("torvalds", "subsurface-for-dirk"),
        ])
        .into_response(),
        "octocat" => Json(vec![repo_json("octocat", "Hello-World")]).into_response(),
        _ => github_message(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn create_repo(
    State(state): State<Arc<FakeGitHubState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    record(&state, Method::POST, &uri, &headers, body.clone());
    if let Err(response) = authorize(&headers) {
        return response;
    }

    let Some(name) = body
        .as_ref()
        .and_then(|b| b.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return github_message(StatusCode::BAD_REQUEST, "Problems parsing JSON");
    };

    if !state.repos.lock().unwrap().insert(name.clone()) {
        return github_message(StatusCode::UNPROCESSABLE_ENTITY, "Repository creation failed.");
    }
    (StatusCode::CREATED, Json(repo_json("octocat", &name))).into_response()
}

async fn delete_repo(
    State(state): State<Arc<FakeGitHubState>>,
    Path((owner, repo)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::DELETE, &uri, &headers, None);
    if let Err(response) = authorize(&headers) {
        return response;
    }

    if owner != "octocat" {
        let mut response = github_message(
            StatusCode::FORBIDDEN,
            "Must have admin rights to Repository.",
        );
        response
            .headers_mut()
            .insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        return response;
    }
    if repo == "old-name" {
        // Renamed repository: GitHub points at the canonical location
        let mut response = github_message(StatusCode::TEMPORARY_REDIRECT, "Moved Permanently");
        response
            .headers_mut()
            .insert("location", HeaderValue::from_static("/repositories/42"));
        return response;
    }
    if state.repos.lock().unwrap().remove(&repo) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        github_message(StatusCode::NOT_FOUND, "Not Found")
    }
}

async fn delete_repo_by_id(
    State(state): State<Arc<FakeGitHubState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::DELETE, &uri, &headers, None);
    StatusCode::NO_CONTENT.into_response()
}

async fn pulls(
    State(state): State<Arc<FakeGitHubState>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, Method::GET, &uri, &headers, None);
    if let Err(response) = authorize(&headers) {
        return response;
    }
    if (owner.as_str(), repo.as_str()) == ("octocat", "Hello-World") {
        // Author account deleted
        return Json(json!([{"number": 1, "title": "Ghost change", "user": null}]))
            .into_response();
    }
    if (owner.as_str(), repo.as_str()) != ("torvalds", "linux") {
        return github_message(StatusCode::NOT_FOUND, "Not Found");
    }

    let per_page = params
        .iter()
        .find(|(k, _)| k == "per_page")
        .and_then(|(_, v)| v.parse::<u64>().ok())
        .unwrap_or(30);
    let pulls: Vec<Value> = (1..=per_page.min(10))
        .rev()
        .map(|number| {
            json!({
                "number": number,
                "title": format!("Pull request #{number}"),
                "state": "open",
                "user": user_json("contributor"),
                "body": "diff"
            })
        })
        .collect();
    Json(pulls).into_response()
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: FakeGitHub,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a fresh fake GitHub
    pub async fn new() -> Self {
        let github = FakeGitHub::start().await;

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 300,
                cookie_name: "jwt".to_string(),
                secure_cookie: false,
            },
            github: config::GitHubConfig {
                api_url: github.url.clone(),
                api_version: "2022-11-28".to_string(),
                user_agent: "ghgate/test".to_string(),
                timeout_seconds: Some(5),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Cookies are handled explicitly so tests can inspect Set-Cookie
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = ghgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Authenticate with `token` and return the `Cookie` header value to
    /// send on later requests
    pub async fn login(&self, token: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth"))
            .query(&[("token", token)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login with {token} failed");

        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("session cookie is set")
            .to_str()
            .unwrap()
            .to_string();
        set_cookie
            .split(';')
            .next()
            .unwrap()
            .trim()
            .to_string()
    }

    /// Sign a session for `token` issued `age` ago
    pub fn session_cookie_aged(&self, token: &str, age: chrono::Duration) -> String {
        use ghgate::auth::{Session, create_session_token};
        use secrecy::SecretString;

        let auth = &self.state.config.auth;
        let issued = chrono::Utc::now() - age;
        let session = Session::issued_at(
            &SecretString::from(token.to_string()),
            issued,
            chrono::Duration::seconds(auth.session_max_age),
        );
        let credential = create_session_token(&session, &auth.session_secret).unwrap();
        format!("{}={}", auth.cookie_name, credential)
    }
}

/// Parse a `{status, message}` envelope
pub async fn envelope(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap();
    (status, body)
}
