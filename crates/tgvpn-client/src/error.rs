//! Client-side error type.

use std::time::Duration;

use tgvpn_api::{ErrorKind, user_message};

/// Failure of a client operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No HTTP response was received.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The attempt exceeded its time budget. The request may still have
    /// reached the server, so the outcome is unknown.
    #[error("Request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The proxy answered with a non-success status.
    #[error("{message}")]
    Http {
        status: u16,
        kind: ErrorKind,
        message: String,
    },

    /// A success response could not be decoded into the expected type.
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// A success status arrived with a body that is not JSON. The request
    /// was accepted, so it must not be repeated.
    #[error("Service temporarily unavailable")]
    UnexpectedBody { status: u16 },

    /// No signed payload is available to authenticate with.
    #[error("Missing Telegram initData")]
    MissingInitData,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            kind: ErrorKind::from_status(status),
            message: message.into(),
        }
    }

    /// HTTP-like status. Timeouts report 408.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(408),
            Self::MissingInitData => Some(401),
            Self::UnexpectedBody { .. } => Some(503),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Http { kind, .. } => *kind,
            Self::Decode { .. } => ErrorKind::Unknown,
            Self::UnexpectedBody { .. } => ErrorKind::Server,
            Self::MissingInitData => ErrorKind::Auth,
        }
    }

    /// A 4xx answer from the server. Timeouts are not client errors even
    /// though they carry 408.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Http { status, .. } => (400..500).contains(status),
            Self::MissingInitData => true,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// What to show the end user.
    pub fn user_message(&self) -> &'static str {
        user_message(self.kind())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode {
                message: e.to_string(),
            }
        } else {
            Self::network(e.to_string())
        }
    }
}
