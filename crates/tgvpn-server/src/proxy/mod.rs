//! Authenticating proxy to the VPN backend.

pub mod auth;
pub mod backend;
pub mod error;
pub mod routes;

pub use auth::{AuthState, TelegramAuth, init_data_from_headers};
pub use backend::BackendClient;
pub use error::ProxyError;
pub use routes::api_routes;
