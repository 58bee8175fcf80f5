//! Typed facade over the proxy endpoints.
//!
//! Every operation is described by an [`Endpoint`] and executed by
//! [`ApiClient::call`], which attaches the identity payload, applies the
//! retry policy, consults the cache for reads and reacts to 401s.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tgvpn_api::{envelope_failure, extract_message, open_envelope};
use tgvpn_auth::{TelegramUser, extract_user};
use time::OffsetDateTime;

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::dispatch::RetryPolicy;
use crate::error::ApiError;
use crate::models::{
    ActiveContest, AutoRenewal, ContestParticipants, ContestTickets, CreateOrder, Order,
    PaymentCheck, PaymentHistory, ReferralFriends, ReferralSummary, TariffList, UserStatus,
    VpnConfig,
};
use crate::state::{AppState, SessionState, Store, Subscription};

mod keys {
    pub const STATUS: &str = "status";
    pub const VPN_CONFIG: &str = "vpn_config";
    pub const TARIFFS: &str = "tariffs";
    pub const PAYMENTS: &str = "payments:";
    pub const AUTORENEWAL: &str = "autorenewal";
    pub const REFERRAL_SUMMARY: &str = "referral:summary";
    pub const REFERRAL_FRIENDS: &str = "referral:friends:";
    pub const CONTEST_ACTIVE: &str = "contest:active";
}

#[derive(Debug, Clone)]
struct CacheSpec {
    key: String,
    ttl: Duration,
    force: bool,
}

/// One request to the proxy: what to send, how to retry it and whether the
/// answer may be cached.
#[derive(Debug, Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    cache: Option<CacheSpec>,
    policy: RetryPolicy,
}

impl Endpoint {
    pub fn get(path: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            cache: None,
            policy,
        }
    }

    pub fn post(path: impl Into<String>, body: Value, policy: RetryPolicy) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            cache: None,
            policy,
        }
    }

    #[must_use]
    pub fn query(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    /// Serve from and store into the response cache under `key`.
    #[must_use]
    pub fn cached(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.cache = Some(CacheSpec {
            key: key.into(),
            ttl,
            force: false,
        });
        self
    }

    /// Skip the cached value but store the fresh one.
    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        if let Some(spec) = self.cache.as_mut() {
            spec.force = true;
        }
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    cache: ResponseCache,
    state: AppState,
    init_data: Store<Option<String>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_state(config, AppState::new())
    }

    /// Build a client that publishes into existing stores.
    pub fn with_state(config: ClientConfig, state: AppState) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            cache: ResponseCache::new(),
            state,
            init_data: Store::new(None),
        }
    }

    #[must_use]
    pub fn with_init_data(self, init_data: impl Into<String>) -> Self {
        self.set_init_data(Some(init_data.into()));
        self
    }

    /// Replace the identity payload. Cached data belongs to the previous
    /// identity and is dropped.
    pub fn set_init_data(&self, init_data: Option<String>) {
        let init_data = init_data.filter(|s| !s.trim().is_empty());
        if init_data != self.init_data.get() {
            self.cache.clear();
            self.state.session.set(SessionState::Unknown);
        }
        self.init_data.set(init_data);
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Identity claimed by the current payload. Not verified locally.
    pub fn user(&self) -> Option<TelegramUser> {
        self.init_data.get().as_deref().and_then(extract_user)
    }

    pub fn logout(&self) {
        self.init_data.set(None);
        self.cache.clear();
        self.state.logout();
    }

    /// Execute `endpoint` and decode its payload.
    pub async fn call<T>(&self, endpoint: Endpoint) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let result = match endpoint.cache.clone() {
            Some(spec) if spec.force => {
                self.cache
                    .refresh(&spec.key, spec.ttl, || self.dispatch(&endpoint))
                    .await
            }
            Some(spec) => {
                self.cache
                    .cached_fetch(&spec.key, spec.ttl, || self.dispatch(&endpoint))
                    .await
            }
            None => self.dispatch(&endpoint).await,
        };

        match &result {
            Ok(_) => {
                if self.state.session.get() != SessionState::Authorized {
                    self.state.session.set(SessionState::Authorized);
                }
            }
            Err(err) if err.is_unauthorized() => self.on_unauthorized(&endpoint.path),
            Err(_) => {}
        }
        result
    }

    fn on_unauthorized(&self, path: &str) {
        tracing::warn!(path = %path, "identity rejected, session is now unauthorized");
        self.cache.clear();
        self.state.subscription.set(Subscription::none());
        self.state.session.set(SessionState::Unauthorized);
    }

    async fn dispatch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, ApiError> {
        let payload = self.init_data.get().ok_or(ApiError::MissingInitData)?;
        endpoint
            .policy
            .run(|| self.send_once(endpoint, &payload))
            .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        payload: &str,
    ) -> Result<T, ApiError> {
        let url = self.config.url(&endpoint.path);
        tracing::debug!(method = %endpoint.method, url = %url, "sending request");

        let mut request = self
            .http
            .request(endpoint.method.clone(), &url)
            .header(AUTHORIZATION, payload)
            .header(ACCEPT, "application/json");
        if !endpoint.query.is_empty() {
            request = request.query(&endpoint.query);
        }
        if let Some(body) = &endpoint.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        handle_response(response).await
    }

    // ============================================================================
    // Account
    // ============================================================================

    /// Subscription status. Publishes the derived [`Subscription`].
    pub async fn status(&self) -> Result<UserStatus, ApiError> {
        self.fetch_status(false).await
    }

    /// Like [`Self::status`] but bypasses the cached value.
    pub async fn refresh_status(&self) -> Result<UserStatus, ApiError> {
        self.fetch_status(true).await
    }

    async fn fetch_status(&self, force: bool) -> Result<UserStatus, ApiError> {
        let mut endpoint = Endpoint::get("user/status", self.config.read_policy)
            .cached(keys::STATUS, self.config.ttls.status);
        if force {
            endpoint = endpoint.force_refresh();
        }
        let status: UserStatus = self.call(endpoint).await?;
        self.state
            .subscription
            .set(Subscription::from_status(&status, OffsetDateTime::now_utc()));
        Ok(status)
    }

    /// The VPN key for the current subscription.
    pub async fn vpn_config(&self) -> Result<VpnConfig, ApiError> {
        self.call(
            Endpoint::get("user/config", self.config.read_policy)
                .cached(keys::VPN_CONFIG, self.config.ttls.vpn_config),
        )
        .await
    }

    // ============================================================================
    // Billing
    // ============================================================================

    pub async fn tariffs(&self) -> Result<TariffList, ApiError> {
        self.call(
            Endpoint::get("tariffs", self.config.read_policy)
                .cached(keys::TARIFFS, self.config.ttls.tariffs),
        )
        .await
    }

    pub async fn payments(&self, page: u32, limit: u32) -> Result<PaymentHistory, ApiError> {
        self.call(
            Endpoint::get("payments", self.config.read_policy)
                .query("page", page)
                .query("limit", limit)
                .cached(
                    format!("{}page={page}:limit={limit}", keys::PAYMENTS),
                    self.config.ttls.payments,
                ),
        )
        .await
    }

    /// Start a purchase. Never cached; retried at most per the write policy.
    pub async fn create_order(&self, order: &CreateOrder) -> Result<Order, ApiError> {
        let body = serde_json::to_value(order).map_err(|e| ApiError::Decode {
            message: e.to_string(),
        })?;
        let created: Order = self
            .call(Endpoint::post("orders", body, self.config.write_policy))
            .await?;
        self.cache.invalidate(keys::STATUS);
        self.cache.invalidate_prefix(keys::PAYMENTS);
        Ok(created)
    }

    /// Ask the backend whether `order_id` has been paid.
    pub async fn check_payment(&self, order_id: &str) -> Result<PaymentCheck, ApiError> {
        let check: PaymentCheck = self
            .call(Endpoint::post(
                "payments/success",
                json!({ "order_id": order_id }),
                self.config.write_policy,
            ))
            .await?;
        if check.paid {
            tracing::info!(order_id = %order_id, "payment confirmed");
            self.cache.invalidate(keys::STATUS);
            self.cache.invalidate(keys::VPN_CONFIG);
            self.cache.invalidate_prefix(keys::PAYMENTS);
        }
        Ok(check)
    }

    pub async fn autorenewal(&self) -> Result<AutoRenewal, ApiError> {
        self.call(
            Endpoint::get("autorenewal", self.config.read_policy)
                .cached(keys::AUTORENEWAL, self.config.ttls.autorenewal),
        )
        .await
    }

    pub async fn set_autorenewal(&self, enabled: bool) -> Result<AutoRenewal, ApiError> {
        let updated: AutoRenewal = self
            .call(Endpoint::post(
                "autorenewal",
                json!({ "enabled": enabled }),
                self.config.write_policy,
            ))
            .await?;
        self.cache.invalidate(keys::AUTORENEWAL);
        self.cache.invalidate(keys::STATUS);
        Ok(updated)
    }

    // ============================================================================
    // Referral
    // ============================================================================

    pub async fn referral_summary(&self) -> Result<ReferralSummary, ApiError> {
        self.call(
            Endpoint::get("referral/summary", self.config.read_policy)
                .cached(keys::REFERRAL_SUMMARY, self.config.ttls.referral),
        )
        .await
    }

    pub async fn referral_friends(&self, page: u32, limit: u32) -> Result<ReferralFriends, ApiError> {
        self.call(
            Endpoint::get("referral/friends", self.config.read_policy)
                .query("page", page)
                .query("limit", limit)
                .cached(
                    format!("{}page={page}:limit={limit}", keys::REFERRAL_FRIENDS),
                    self.config.ttls.referral,
                ),
        )
        .await
    }

    // ============================================================================
    // Contest
    // ============================================================================

    pub async fn contest_active(&self) -> Result<ActiveContest, ApiError> {
        self.call(
            Endpoint::get("contest/active", self.config.read_policy)
                .cached(keys::CONTEST_ACTIVE, self.config.ttls.contest),
        )
        .await
    }

    pub async fn contest_participants(
        &self,
        contest_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<ContestParticipants, ApiError> {
        self.call(
            Endpoint::get("contest/participants", self.config.read_policy)
                .query("contest_id", contest_id)
                .query("page", page)
                .query("limit", limit)
                .cached(
                    format!("contest:{contest_id}:participants:page={page}:limit={limit}"),
                    self.config.ttls.contest_entries,
                ),
        )
        .await
    }

    pub async fn contest_tickets(&self, contest_id: &str) -> Result<ContestTickets, ApiError> {
        self.call(
            Endpoint::get("contest/tickets", self.config.read_policy)
                .query("contest_id", contest_id)
                .cached(
                    format!("contest:{contest_id}:tickets"),
                    self.config.ttls.contest_entries,
                ),
        )
        .await
    }
}

/// Turn a proxy response into a payload or a typed error.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = extract_message(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %message, "request failed");
        return Err(ApiError::http(status.as_u16(), message));
    }

    let value = if body.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str::<Value>(&body).map_err(|_| {
            tracing::warn!(status = status.as_u16(), "success response is not JSON");
            ApiError::UnexpectedBody {
                status: status.as_u16(),
            }
        })?
    };

    if let Some(message) = envelope_failure(&value) {
        return Err(ApiError::http(400, message));
    }

    serde_json::from_value(open_envelope(value)).map_err(|e| ApiError::Decode {
        message: e.to_string(),
    })
}
