//! Error taxonomy shared by the proxy and the client.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used whenever an upstream answers with something that is not JSON
/// (HTML error pages from load balancers, plain-text stack traces, ...).
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request never produced an HTTP response (DNS, connect, reset, timeout).
    Network,
    /// 401, or the signed payload was missing, invalid or expired.
    Auth,
    /// 403
    Permission,
    /// 404
    NotFound,
    /// 5xx
    Server,
    /// Any other 4xx.
    Validation,
    Unknown,
}

impl ErrorKind {
    /// Classify an HTTP status code. `0` stands for "no response at all".
    pub fn from_status(status: u16) -> Self {
        match status {
            0 | 408 => Self::Network,
            401 => Self::Auth,
            403 => Self::Permission,
            404 => Self::NotFound,
            400..=499 => Self::Validation,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Status used when a failure of this kind has to be reported without an
    /// upstream status to pass through.
    pub fn default_status(self) -> StatusCode {
        match self {
            Self::Network => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Permission => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Server => StatusCode::BAD_GATEWAY,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fallback message when the upstream body carries none.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Auth => "Unauthorized",
            Self::Permission => "Forbidden",
            Self::NotFound => "Not found",
            Self::Server => "Internal server error",
            Self::Validation => "Invalid request",
            Self::Unknown => "Unknown error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Auth => "AUTH",
            Self::Permission => "PERMISSION",
            Self::NotFound => "NOT_FOUND",
            Self::Server => "SERVER",
            Self::Validation => "VALIDATION",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ "error": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An `{ error }` body paired with the status it is sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_status(self.status.as_u16())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// JSON bodies are searched for `error`, `message` and `detail` (a string, or
/// a list of `{ msg }` validation items). Bodies that are not JSON are never
/// echoed back; they collapse into [`SERVICE_UNAVAILABLE_MESSAGE`].
pub fn extract_message(status: u16, body: &str) -> String {
    let kind = ErrorKind::from_status(status);
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return kind.default_message().to_string();
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return SERVICE_UNAVAILABLE_MESSAGE.to_string();
    };

    message_from_json(&value).unwrap_or_else(|| kind.default_message().to_string())
}

fn message_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => ["error", "message", "detail"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(message_from_json),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| message_from_json(item))
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}
