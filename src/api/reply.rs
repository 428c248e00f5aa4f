//! Response envelope and JSON rendering
//!
//! Every response body is pretty-printed JSON: either the `{status, message}`
//! envelope or the projected record(s).

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::github::RateLimit;

/// `{status, message}` body for outcomes that carry no record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiMessage {
    pub status: u16,
    pub message: String,
}

impl ApiMessage {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// JSON body indented with four spaces
pub struct PrettyJson<T>(pub StatusCode, pub T);

pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match to_pretty_json(&self.1) {
            Ok(body) => (
                self.0,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json; charset=utf-8"),
                )],
                body,
            )
                .into_response(),
            Err(error) => {
                tracing::error!(%error, "Failed to serialize response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json; charset=utf-8"),
                    )],
                    r#"{"status": 500, "message": "Unexpected error"}"#,
                )
                    .into_response()
            }
        }
    }
}

/// What a handler answers once the upstream outcome is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Projected record(s) with the given status
    Record(StatusCode, T),
    /// Envelope only
    Message(ApiMessage),
}

impl<T> Reply<T> {
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Reply::Message(ApiMessage::new(status, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Record(status, _) => *status,
            Reply::Message(message) => {
                StatusCode::from_u16(message.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Reply::Record(_, record) => PrettyJson(status, record).into_response(),
            Reply::Message(message) => PrettyJson(status, message).into_response(),
        }
    }
}

/// Per-endpoint classification of a GitHub response
///
/// Implementors are plain enums; `into_reply` is a pure mapping so status
/// tables can be tested without a network.
pub trait Outcome: Sized {
    type Record: Serialize;

    fn into_reply(self) -> Reply<Self::Record>;

    /// Rate-limit details when GitHub refused the call for quota reasons
    fn rate_limit(&self) -> Option<&RateLimit> {
        None
    }
}

/// Message for upstream statuses an endpoint does not recognize
pub const UNEXPECTED_STATUS: &str = "Unexpected status code";

pub(crate) fn unexpected<T>(status: StatusCode) -> Reply<T> {
    Reply::message(status, UNEXPECTED_STATUS)
}
