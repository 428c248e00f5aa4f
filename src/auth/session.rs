//! Session management
//!
//! Sessions are HS256-signed JWTs stored in a cookie. The only claim of
//! interest is the caller's GitHub token; validity is decided entirely by
//! the signature and the embedded expiry. No server-side session storage.

use axum_extra::extract::cookie::Cookie;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

const JWT_ALGORITHM: &str = "HS256";

/// Why a session credential was rejected
///
/// Callers only ever see "Not authenticated"; the variants exist for logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session credential")]
    Malformed,
    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,
    #[error("session signature mismatch")]
    InvalidSignature,
    #[error("session expired")]
    Expired,
    #[error("failed to encode session: {0}")]
    Encoding(String),
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by the session credential
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    /// GitHub token of the caller
    token: String,
    /// Issued at (unix seconds)
    iat: i64,
    /// Expires at (unix seconds)
    exp: i64,
}

impl Session {
    /// New session for `token`, valid for `ttl` from now
    pub fn new(token: &SecretString, ttl: Duration) -> Self {
        Self::issued_at(token, Utc::now(), ttl)
    }

    /// New session for `token` issued at `now`, valid for `ttl`
    pub fn issued_at(token: &SecretString, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: token.expose_secret().to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// The GitHub token embedded in this session
    pub fn upstream_token(&self) -> SecretString {
        SecretString::from(self.token.clone())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if session is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, SessionError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SessionError::Encoding(e.to_string()))
}

/// Create a signed session credential
///
/// Token format: base64url(header).base64url(claims).base64url(hmac_sha256)
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, SessionError> {
    let header = Header {
        alg: JWT_ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| SessionError::Encoding(e.to_string()))?;
    let claims_json =
        serde_json::to_vec(session).map_err(|e| SessionError::Encoding(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(header_json),
        general_purpose::URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        signing_input,
        general_purpose::URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify and decode a session credential against the current time
pub fn verify_session_token(credential: &str, secret: &str) -> Result<Session, SessionError> {
    verify_session_token_at(credential, secret, Utc::now())
}

/// Verify and decode a session credential
///
/// # Errors
/// Returns the specific reason the credential was rejected: wrong shape,
/// wrong algorithm, bad signature, or expiry at `now`.
pub fn verify_session_token_at(
    credential: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Session, SessionError> {
    let mut parts = credential.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::Malformed);
    };

    let header_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| SessionError::Malformed)?;
    let header: Header =
        serde_json::from_slice(&header_bytes).map_err(|_| SessionError::Malformed)?;
    if header.alg != JWT_ALGORITHM {
        return Err(SessionError::UnsupportedAlgorithm);
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SessionError::Malformed)?;
    let mut mac = mac_for(secret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SessionError::InvalidSignature)?;

    let claims_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| SessionError::Malformed)?;
    let session: Session =
        serde_json::from_slice(&claims_bytes).map_err(|_| SessionError::Malformed)?;

    if session.is_expired_at(now) {
        return Err(SessionError::Expired);
    }

    Ok(session)
}

/// Cookie carrying a freshly issued credential
pub fn session_cookie(credential: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), credential))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .max_age(time::Duration::seconds(config.session_max_age))
        .build()
}

/// Already-expired cookie that makes the browser drop the session
pub fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .build();
    cookie.make_removal();
    cookie
}
