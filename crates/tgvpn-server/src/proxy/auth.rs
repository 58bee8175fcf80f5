//! Extractor that authenticates the Telegram init data carried by a request.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use tgvpn_api::INIT_DATA_HEADER;
use tgvpn_auth::{AuthProvider, TelegramUser};

use super::error::ProxyError;

/// Scheme prefix some clients put in front of the payload in `Authorization`.
const TMA_SCHEME: &str = "tma ";

#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<dyn AuthProvider>,
}

impl AuthState {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }
}

/// An authenticated caller.
///
/// Rejects with 401 `{ "error": ... }` before the handler runs, so no
/// backend call is made for unauthenticated requests.
#[derive(Debug, Clone)]
pub struct TelegramAuth {
    /// Payload to forward as the backend `Authorization` header.
    pub init_data: String,
    pub user: Option<TelegramUser>,
}

impl TelegramAuth {
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

impl<S> FromRequestParts<S> for TelegramAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ProxyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let raw = init_data_from_headers(&parts.headers);

        let authenticated = auth_state.provider.authenticate(raw)?;

        tracing::debug!(
            provider = auth_state.provider.name(),
            user_id = ?authenticated.user.as_ref().map(|u| u.id),
            endpoint = %parts.uri.path(),
            method = %parts.method,
            "init data accepted"
        );

        Ok(TelegramAuth {
            init_data: authenticated.init_data,
            user: authenticated.user,
        })
    }
}

/// First non-empty payload from `X-Telegram-Init-Data` or `Authorization`.
pub fn init_data_from_headers(headers: &HeaderMap) -> Option<&str> {
    [INIT_DATA_HEADER, "authorization"]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .map(strip_scheme)
        .find(|value| !value.is_empty())
}

fn strip_scheme(value: &str) -> &str {
    let value = value.trim();
    match value.get(..TMA_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(TMA_SCHEME) => value[TMA_SCHEME.len()..].trim(),
        _ => value,
    }
}
