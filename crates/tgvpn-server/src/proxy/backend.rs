//! Forwarding of authenticated requests to the VPN backend.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tgvpn_api::extract_message;
use tracing::{debug, info, instrument, warn};

use super::auth::TelegramAuth;
use super::error::ProxyError;
use crate::config::BackendConfig;

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client bound to one backend and its credentials.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    /// `base_url` joined with the API prefix, no trailing slash.
    base: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base", &self.base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .build()?;
        let base = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string();

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            timeout: config.timeout(),
        })
    }

    /// Backend URL for an endpoint path such as `user/status`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Send one request on behalf of `auth` and return the backend's JSON.
    ///
    /// `query` is the raw query string of the inbound request and is passed
    /// along untouched.
    #[instrument(skip(self, auth, body), fields(user_id = ?auth.user_id()))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        auth: &TelegramAuth,
        body: Option<&Value>,
    ) -> Result<Value, ProxyError> {
        let mut url = self.endpoint_url(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, auth.init_data.as_str())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend request completed"
        );

        if !status.is_success() {
            let message = extract_message(status.as_u16(), &text);
            debug!(status = status.as_u16(), error = %message, "backend returned an error");
            let status = if status.is_client_error() || status.is_server_error() {
                status
            } else {
                StatusCode::BAD_GATEWAY
            };
            return Err(ProxyError::Backend { status, message });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "backend returned a non-JSON success body");
            ProxyError::Unavailable(format!("backend returned a non-JSON body: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, api_prefix: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: base_url.into(),
            api_prefix: api_prefix.into(),
            api_key: Some("secret".into()),
            timeout_ms: 1_000,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_url_joins_prefix() {
        assert_eq!(
            client("http://backend:8000/", "/v1").endpoint_url("user/status"),
            "http://backend:8000/v1/user/status"
        );
        assert_eq!(
            client("http://backend:8000", "").endpoint_url("/tariffs"),
            "http://backend:8000/tariffs"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let rendered = format!("{:?}", client("http://backend", "/v1"));
        assert!(!rendered.contains("secret"));
    }
}
