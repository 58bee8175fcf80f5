//! Client for the TgVPN proxy.
//!
//! [`ApiClient`] exposes one method per backend capability. Reads go through
//! a [`ResponseCache`] with per-resource TTLs; every request is wrapped in a
//! [`RetryPolicy`] that bounds each attempt with a timeout and retries
//! transient failures with exponential backoff.
//!
//! ```no_run
//! # async fn demo() -> Result<(), tgvpn_client::ApiError> {
//! use tgvpn_client::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(ClientConfig::new("https://vpn.example.com"))
//!     .with_init_data("query_id=...&user=...&auth_date=...&hash=...");
//! let tariffs = client.tariffs().await?;
//! println!("{} tariffs", tariffs.tariffs.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod deeplink;
pub mod dispatch;
pub mod error;
pub mod local_store;
pub mod models;
pub mod setup;
pub mod state;

pub use cache::ResponseCache;
pub use client::{ApiClient, Endpoint};
pub use config::{CacheTtls, ClientConfig};
pub use dispatch::{RetryPolicy, Retryable, backoff_delay, with_retry, with_timeout};
pub use error::ApiError;
pub use local_store::{LocalStore, StoreError};
pub use setup::{Platform, SetupStep};
pub use state::{AppState, SessionState, Store, Subscription, SubscriptionStatus};
