//! # tgvpn-auth
//!
//! Identity layer for the TgVPN Mini App.
//!
//! Telegram hands every Mini App a signed `initData` string. This crate:
//! - parses it into fields and the embedded [`TelegramUser`]
//! - verifies its HMAC-SHA256 signature against the bot token
//! - rejects payloads older than the freshness window (24h by default)
//! - exposes the [`AuthProvider`] seam so a deployment picks real validation
//!   or a development stub once, at startup
//!
//! ## Modules
//!
//! - [`init_data`] - Parsing and field access
//! - [`signature`] - Validation and signing
//! - [`provider`] - [`TelegramProvider`] and [`StubProvider`]
//! - [`error`] - [`AuthError`]

pub mod error;
pub mod init_data;
pub mod provider;
pub mod signature;

pub use error::AuthError;
pub use init_data::{InitData, TelegramUser, extract_user};
pub use provider::{AuthProvider, Authenticated, StubProvider, TelegramProvider};
pub use signature::{
    DEFAULT_MAX_AGE, WEB_APP_DATA_KEY, sign_fields, validate, validate_at, verify, verify_at,
};

/// Type alias for results produced by this crate.
pub type AuthResult<T> = Result<T, AuthError>;
