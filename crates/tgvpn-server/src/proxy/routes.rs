//! `/api` endpoints consumed by the Mini App.
//!
//! Every handler takes a [`TelegramAuth`], so the init data is checked
//! before anything is read from the body or sent upstream. Paths are
//! forwarded unchanged below the backend API prefix.

use axum::{
    Json, Router,
    extract::{RawQuery, State, rejection::JsonRejection},
    routing::{get, post},
};
use reqwest::Method;
use serde_json::Value;
use tgvpn_api::ok_envelope;

use super::auth::TelegramAuth;
use super::backend::BackendClient;
use super::error::ProxyError;
use crate::server::AppState;

type ProxyResult = Result<Json<Value>, ProxyError>;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/user/status", get(user_status))
        .route("/user/config", get(user_config))
        .route("/tariffs", get(tariffs))
        .route("/payments", get(payments))
        .route("/payments/success", post(payment_success))
        .route("/orders", post(create_order))
        .route("/autorenewal", get(autorenewal).post(set_autorenewal))
        .route("/referral/summary", get(referral_summary))
        .route("/referral/friends", get(referral_friends))
        .route("/contest/active", get(contest_active))
        .route("/contest/participants", get(contest_participants))
        .route("/contest/tickets", get(contest_tickets))
}

async fn forward_get(
    backend: &BackendClient,
    path: &str,
    auth: &TelegramAuth,
    query: Option<String>,
) -> ProxyResult {
    let value = backend
        .forward(Method::GET, path, query.as_deref(), auth, None)
        .await?;
    Ok(Json(ok_envelope(value)))
}

async fn forward_post(
    backend: &BackendClient,
    path: &str,
    auth: &TelegramAuth,
    body: &Value,
) -> ProxyResult {
    let value = backend
        .forward(Method::POST, path, None, auth, Some(body))
        .await?;
    Ok(Json(ok_envelope(value)))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ProxyError> {
    let Json(value) = body.map_err(|rejection| ProxyError::BadRequest(rejection.body_text()))?;
    if !value.is_object() {
        return Err(ProxyError::BadRequest(
            "Request body must be a JSON object".into(),
        ));
    }
    Ok(value)
}

/// Require `field` to be a non-empty string or a number.
fn require_id(body: &Value, field: &str) -> Result<(), ProxyError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::Number(_)) => Ok(()),
        _ => Err(ProxyError::BadRequest(format!("`{field}` is required"))),
    }
}

async fn user_status(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "user/status", &auth, query).await
}

async fn user_config(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "user/config", &auth, query).await
}

async fn tariffs(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "tariffs", &auth, query).await
}

async fn payments(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "payments", &auth, query).await
}

async fn payment_success(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    require_id(&body, "order_id")?;
    forward_post(&backend, "payments/success", &auth, &body).await
}

async fn create_order(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    require_id(&body, "tariff_id")?;
    tracing::info!(user_id = ?auth.user_id(), tariff_id = %body["tariff_id"], "creating order");
    forward_post(&backend, "orders", &auth, &body).await
}

async fn autorenewal(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "autorenewal", &auth, query).await
}

async fn set_autorenewal(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    if !body.get("enabled").is_some_and(Value::is_boolean) {
        return Err(ProxyError::BadRequest("`enabled` must be a boolean".into()));
    }
    forward_post(&backend, "autorenewal", &auth, &body).await
}

async fn referral_summary(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "referral/summary", &auth, query).await
}

async fn referral_friends(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "referral/friends", &auth, query).await
}

async fn contest_active(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "contest/active", &auth, query).await
}

async fn contest_participants(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "contest/participants", &auth, query).await
}

async fn contest_tickets(
    State(backend): State<BackendClient>,
    auth: TelegramAuth,
    RawQuery(query): RawQuery,
) -> ProxyResult {
    forward_get(&backend, "contest/tickets", &auth, query).await
}
