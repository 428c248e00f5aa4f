//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub github: GitHubConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session configuration
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for signing session credentials (32+ bytes)
    pub session_secret: String,
    /// Session lifetime in seconds (default: 300)
    pub session_max_age: i64,
    /// Name of the session cookie (default: "jwt")
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (default: false)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"[REDACTED]")
            .field("session_max_age", &self.session_max_age)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

/// Upstream GitHub API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL (default: "https://api.github.com")
    pub api_url: String,
    /// Value of the `X-GitHub-Api-Version` header
    pub api_version: String,
    /// `User-Agent` sent upstream (GitHub rejects requests without one)
    pub user_agent: String,
    /// Optional request timeout; the HTTP client default applies when unset
    pub timeout_seconds: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GHGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("auth.session_max_age", 300)?
            .set_default("auth.cookie_name", "jwt")?
            .set_default("auth.secure_cookie", false)?
            .set_default("github.api_url", "https://api.github.com")?
            .set_default("github.api_version", "2022-11-28")?
            .set_default(
                "github.user_agent",
                concat!("ghgate/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("GHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;
        const MAX_SESSION_MAX_AGE: i64 = 86_400;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_max_age > MAX_SESSION_MAX_AGE {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must be at most {} seconds",
                MAX_SESSION_MAX_AGE
            )));
        }

        if self.auth.cookie_name.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.cookie_name must not be empty".to_string(),
            ));
        }

        let api_url = url::Url::parse(&self.github.api_url).map_err(|e| {
            crate::error::AppError::Config(format!("github.api_url is not a valid URL: {e}"))
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(crate::error::AppError::Config(
                "github.api_url must use http or https".to_string(),
            ));
        }

        if !self.auth.secure_cookie {
            tracing::warn!("Session cookie is not marked Secure; serve behind TLS in production");
        }

        Ok(())
    }
}
