use std::time::Duration;

use serde_json::{Value, json};
use tgvpn_auth::{StubProvider, TelegramUser, sign_fields};
use tgvpn_server::config::AuthProviderKind;
use tgvpn_server::{AppConfig, build_app};
use tokio::task::JoinHandle;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOT_TOKEN: &str = "123456:proxy-test-token";
const API_KEY: &str = "server-side-key";

struct TestServer {
    base: String,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

fn config_for(backend_url: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.backend.base_url = backend_url.to_string();
    cfg.backend.api_key = Some(API_KEY.to_string());
    cfg.auth.bot_token = BOT_TOKEN.to_string();
    cfg
}

async fn start_server(cfg: AppConfig) -> TestServer {
    let app = build_app(&cfg).expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        shutdown: tx,
        handle,
    }
}

fn user() -> TelegramUser {
    TelegramUser {
        id: 4242,
        first_name: "Ann".into(),
        last_name: None,
        username: Some("ann".into()),
        language_code: Some("en".into()),
        is_premium: false,
        photo_url: None,
    }
}

fn signed_payload() -> String {
    StubProvider::for_user(&user(), BOT_TOKEN).init_data().to_string()
}

async fn error_of(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn forged_signature_is_rejected_without_backend_call() {
    let backend = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;

    let forged = StubProvider::for_user(&user(), "999:someone-else").init_data().to_string();
    let resp = reqwest::Client::new()
        .get(format!("{}/api/user/status", server.base))
        .header("x-telegram-init-data", forged)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid Telegram initData signature" }));

    server.stop().await;
}

#[tokio::test]
async fn missing_and_expired_init_data_are_unauthorized() {
    let backend = MockServer::start().await;
    let server = start_server(config_for(&backend.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/tariffs", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error_of(resp).await, "Missing Telegram initData");

    let stale = sign_fields(
        [("auth_date", "1000000000"), ("user", r#"{"id":1}"#)],
        BOT_TOKEN,
    );
    let resp = client
        .get(format!("{}/api/tariffs", server.base))
        .header("x-telegram-init-data", stale)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error_of(resp).await, "Telegram initData expired");

    assert!(backend.received_requests().await.unwrap().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn valid_request_is_forwarded_with_server_credentials() {
    let backend = MockServer::start().await;
    let payload = signed_payload();
    Mock::given(method("GET"))
        .and(path("/v1/user/status"))
        .and(header("authorization", payload.as_str()))
        .and(header("x-api-key", API_KEY))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "active",
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/user/status", server.base))
        .header("x-telegram-init-data", &payload)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "ok": true, "status": "active", "expires_at": "2099-01-01T00:00:00Z" })
    );

    server.stop().await;
}

#[tokio::test]
async fn authorization_header_and_query_are_accepted() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payments": [],
            "total": 0
        })))
        .expect(1)
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/payments?page=2&limit=10", server.base))
        .header("authorization", format!("tma {}", signed_payload()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["total"], 0);

    server.stop().await;
}

#[tokio::test]
async fn list_payloads_are_wrapped() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tariffs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1, "name": "Month", "price": 199 }])),
        )
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/tariffs", server.base))
        .header("x-telegram-init-data", signed_payload())
        .send()
        .await
        .unwrap();

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"][0]["name"], "Month");

    server.stop().await;
}

#[tokio::test]
async fn order_body_is_forwarded_and_validated() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(body_json(json!({ "tariff_id": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "order_id": "o-1",
            "payment_url": "https://pay.example.com/o-1"
        })))
        .expect(1)
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/orders", server.base))
        .header("x-telegram-init-data", signed_payload())
        .json(&json!({ "tariff_id": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["order_id"], "o-1");

    let resp = client
        .post(format!("{}/api/orders", server.base))
        .header("x-telegram-init-data", signed_payload())
        .json(&json!({ "promo_code": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error_of(resp).await, "`tariff_id` is required");

    server.stop().await;
}

#[tokio::test]
async fn autorenewal_toggle_requires_boolean() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/autorenewal"))
        .and(body_json(json!({ "enabled": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "enabled": false })))
        .expect(1)
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/autorenewal", server.base))
        .header("x-telegram-init-data", signed_payload())
        .json(&json!({ "enabled": "no" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/autorenewal", server.base))
        .header("x-telegram-init-data", signed_payload())
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true, "enabled": false }));

    server.stop().await;
}

#[tokio::test]
async fn backend_errors_keep_status_and_hide_markup() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/success"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Order not found" })),
        )
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/contest/active"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw("<html><h1>Internal Server Error</h1></html>", "text/html"),
        )
        .mount(&backend)
        .await;
    let server = start_server(config_for(&backend.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/payments/success", server.base))
        .header("x-telegram-init-data", signed_payload())
        .json(&json!({ "order_id": "missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(error_of(resp).await, "Order not found");

    let resp = client
        .get(format!("{}/api/contest/active", server.base))
        .header("x-telegram-init-data", signed_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(error_of(resp).await, "Service temporarily unavailable");

    server.stop().await;
}

#[tokio::test]
async fn slow_backend_yields_gateway_timeout() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/referral/summary"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "invited_count": 1 }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&backend)
        .await;
    let mut cfg = config_for(&backend.uri());
    cfg.backend.timeout_ms = 200;
    let server = start_server(cfg).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/referral/summary", server.base))
        .header("x-telegram-init-data", signed_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 504);
    assert_eq!(error_of(resp).await, "Backend request timed out");

    server.stop().await;
}

#[tokio::test]
async fn unreachable_backend_is_service_unavailable() {
    // Reserve a port, then free it so nothing listens there.
    let listener = std::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let server = start_server(config_for(&dead)).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/api/contest/tickets?contest_id=1", server.base))
        .header("x-telegram-init-data", signed_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    assert_eq!(error_of(resp).await, "Service temporarily unavailable");

    server.stop().await;
}

#[tokio::test]
async fn stub_provider_substitutes_mock_identity() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/config"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "key": "vless://dev" })))
        .expect(1)
        .mount(&backend)
        .await;
    let mut cfg = config_for(&backend.uri());
    cfg.auth.provider = AuthProviderKind::Stub;
    cfg.auth.bot_token.clear();
    let server = start_server(cfg).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/user/config", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let requests = backend.received_requests().await.unwrap();
    let forwarded = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(forwarded.contains("user="));

    server.stop().await;
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let server = start_server(config_for("http://127.0.0.1:9")).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/healthz", server.base)).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{}/readyz", server.base)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");

    let resp = client.get(format!("{}/", server.base)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "TgVPN Proxy");
    assert_eq!(body["auth"], "telegram");

    let resp = client
        .get(format!("{}/api/nope", server.base))
        .header("x-request-id", "req-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.headers()["x-request-id"], "req-1");
    assert_eq!(error_of(resp).await, "Not found");

    server.stop().await;
}
