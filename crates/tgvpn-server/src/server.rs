use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tgvpn_api::INIT_DATA_HEADER;
use tgvpn_auth::AuthProvider;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::{AppConfig, AuthProviderKind},
    handlers,
    middleware as app_middleware,
    proxy::{AuthState, BackendClient, api_routes},
};

/// Shared by all handlers. Holds no per-request state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthState,
    pub backend: BackendClient,
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        Self::with_provider(cfg, cfg.auth.build_provider())
    }

    pub fn with_provider(cfg: &AppConfig, provider: Arc<dyn AuthProvider>) -> anyhow::Result<Self> {
        let backend =
            BackendClient::new(&cfg.backend).context("failed to create backend HTTP client")?;
        Ok(Self {
            config: Arc::new(cfg.clone()),
            auth: AuthState::new(provider),
            backend,
        })
    }
}

pub struct TgvpnServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg)?;
    build_router(state)
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cfg = Arc::clone(&state.config);
    if cfg.auth.provider == AuthProviderKind::Stub {
        tracing::warn!("stub authentication is active; init data is NOT validated");
    }

    let cors = cors_layer(&cfg.cors.allowed_origins)?;

    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api", api_routes().fallback(handlers::not_found))
        .fallback(handlers::not_found)
        .with_state(state)
        // Outermost first: request id -> trace -> cors -> timeout -> body limit
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri().path(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record("http.status_code", res.status().as_u16());
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    cfg.request_timeout(),
                    app_middleware::request_timeout,
                ))
                .layer(axum::extract::DefaultBodyLimit::max(
                    cfg.server.body_limit_bytes,
                )),
        );

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let origins = allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o.trim()).with_context(|| format!("invalid CORS origin `{o}`"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(INIT_DATA_HEADER),
            HeaderName::from_static(app_middleware::REQUEST_ID_HEADER),
        ]))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    provider: Option<Arc<dyn AuthProvider>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            provider: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use `provider` instead of the one named in the configuration.
    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> anyhow::Result<TgvpnServer> {
        let provider = self
            .provider
            .unwrap_or_else(|| self.config.auth.build_provider());
        tracing::info!(
            provider = provider.name(),
            backend = %self.config.backend.base_url,
            "authentication provider selected"
        );
        let state = AppState::with_provider(&self.config, provider)?;
        let app = build_router(state)?;

        Ok(TgvpnServer {
            addr: self.addr,
            app,
        })
    }
}

impl TgvpnServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
