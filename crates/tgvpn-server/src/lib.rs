//! Authenticating proxy between the TgVPN Mini App and the VPN backend.
//!
//! Browsers call `/api/...` with their Telegram init data. Each request is
//! validated, forwarded with the server's credentials and its answer wrapped
//! as `{ ok: true, ... }` or `{ error }`.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod proxy;
pub mod server;

pub use config::{AppConfig, AuthProviderKind, BackendConfig};
pub use observability::init_tracing;
pub use proxy::{BackendClient, ProxyError, TelegramAuth};
pub use server::{AppState, ServerBuilder, TgvpnServer, build_app, build_router};
