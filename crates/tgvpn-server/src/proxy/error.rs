//! Proxy error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tgvpn_api::{ErrorResponse, SERVICE_UNAVAILABLE_MESSAGE};
use tgvpn_auth::AuthError;

/// Everything a proxied request can fail with. Rendered as `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The init data was missing or did not validate.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The browser sent an unusable request body or query.
    #[error("{0}")]
    BadRequest(String),

    /// The backend answered with an error status.
    #[error("{message}")]
    Backend { status: StatusCode, message: String },

    /// The backend could not be reached.
    #[error("Service temporarily unavailable")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("Backend request timed out")]
    Timeout,

    #[error("Internal server error")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(e) if e.is_client_error() => StatusCode::UNAUTHORIZED,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Backend { status, .. } => *status,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Configuration problems are ours; keep details in the logs.
            Self::Auth(AuthError::Configuration { .. }) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Unavailable(_) => SERVICE_UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unavailable(format!("failed to connect to backend: {e}"))
        } else if e.is_builder() {
            Self::Internal(format!("failed to build backend request: {e}"))
        } else {
            Self::Unavailable(format!("backend request failed: {e}"))
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Auth(AuthError::Configuration { message }) => {
                tracing::error!(error = %message, "authentication is misconfigured");
            }
            Self::Auth(e) => tracing::debug!(error = %e, "rejected init data"),
            Self::Unavailable(reason) => tracing::warn!(reason = %reason, "backend unavailable"),
            Self::Internal(reason) => tracing::error!(reason = %reason, "proxy failure"),
            Self::Timeout => tracing::warn!("backend request timed out"),
            Self::Backend { .. } | Self::BadRequest(_) => {}
        }
        ErrorResponse::new(status, self.public_message()).into_response()
    }
}
