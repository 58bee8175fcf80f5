//! Application state shared between the client and whatever hosts it.
//!
//! State lives in explicit [`Store`]s handed to the client at construction.
//! `get`, `set` and `subscribe` are the only ways to touch it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;

use crate::models::UserStatus;

/// Observable value. Cloning yields another handle to the same value.
#[derive(Debug)]
pub struct Store<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify subscribers, even if nobody listens yet.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    None,
    /// Nothing fetched yet in this session.
    #[default]
    Loading,
}

impl SubscriptionStatus {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "none" | "inactive" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl Subscription {
    pub fn none() -> Self {
        Self {
            status: SubscriptionStatus::None,
            expires_at: None,
        }
    }

    /// Derive the subscription from a status payload.
    ///
    /// An explicit `status` string wins; otherwise the expiry date decides.
    /// An expiry that does not parse as RFC 3339 counts as active, since the
    /// backend only sends it for paid accounts.
    pub fn from_status(status: &UserStatus, now: OffsetDateTime) -> Self {
        let expires_at = status.expires_at.clone().filter(|s| !s.is_empty());

        let derived = status
            .status
            .as_deref()
            .and_then(SubscriptionStatus::parse)
            .unwrap_or_else(|| match expires_at.as_deref() {
                None => SubscriptionStatus::None,
                Some(raw) => match OffsetDateTime::parse(raw, &Rfc3339) {
                    Ok(at) if at <= now => SubscriptionStatus::Expired,
                    _ => SubscriptionStatus::Active,
                },
            });

        Self {
            status: derived,
            expires_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unknown,
    Authorized,
    /// The proxy rejected the identity payload; the host must re-authenticate.
    Unauthorized,
}

/// Stores injected into [`crate::ApiClient`].
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub subscription: Store<Subscription>,
    pub session: Store<SessionState>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logout(&self) {
        self.subscription.set(Subscription::none());
        self.session.set(SessionState::Unauthorized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn status(status: Option<&str>, expires_at: Option<&str>) -> UserStatus {
        UserStatus {
            status: status.map(str::to_string),
            expires_at: expires_at.map(str::to_string),
            ..UserStatus::default()
        }
    }

    #[test]
    fn explicit_status_wins() {
        let now = datetime!(2025-01-01 0:00 UTC);
        let sub = Subscription::from_status(
            &status(Some("Expired"), Some("2030-01-01T00:00:00Z")),
            now,
        );
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert_eq!(sub.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
    }

    #[test]
    fn expiry_decides_without_status() {
        let now = datetime!(2025-01-01 0:00 UTC);
        let future = Subscription::from_status(&status(None, Some("2025-02-01T00:00:00Z")), now);
        let past = Subscription::from_status(&status(None, Some("2024-12-01T00:00:00Z")), now);
        let empty = Subscription::from_status(&status(None, None), now);

        assert!(future.is_active());
        assert_eq!(past.status, SubscriptionStatus::Expired);
        assert_eq!(empty, Subscription::none());
    }

    #[test]
    fn store_notifies_subscribers() {
        let store = Store::new(SessionState::Unknown);
        let mut rx = store.subscribe();
        let other = store.clone();

        other.set(SessionState::Authorized);

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Authorized);
        assert_eq!(store.get(), SessionState::Authorized);
    }

    #[test]
    fn logout_resets_subscription() {
        let state = AppState::new();
        assert_eq!(state.subscription.get().status, SubscriptionStatus::Loading);
        state.subscription.set(Subscription {
            status: SubscriptionStatus::Active,
            expires_at: None,
        });

        state.logout();

        assert_eq!(state.subscription.get(), Subscription::none());
        assert_eq!(state.session.get(), SessionState::Unauthorized);
    }
}
