use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use tgvpn_api::ErrorResponse;

use crate::server::AppState;

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "service": "TgVPN Proxy",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "auth": state.auth.provider.name(),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    // Stateless: ready as soon as the listener is up.
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

pub async fn not_found() -> ErrorResponse {
    ErrorResponse::new(StatusCode::NOT_FOUND, "Not found")
}
