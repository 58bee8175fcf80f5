//! Pluggable authentication of inbound requests.
//!
//! A deployment selects exactly one provider at startup:
//!
//! - [`TelegramProvider`] verifies the payload against the bot token.
//! - [`StubProvider`] accepts anything and substitutes a mock identity when no
//!   payload is sent. It exists for local development outside Telegram.

use std::fmt;

use time::{Duration, OffsetDateTime};

use crate::error::AuthError;
use crate::init_data::{TelegramUser, extract_user};
use crate::signature::{DEFAULT_MAX_AGE, sign_fields, verify_at};

/// Result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    /// The payload to forward upstream.
    pub init_data: String,
    pub user: Option<TelegramUser>,
}

pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Authenticate the payload carried by a request, if any.
    fn authenticate(&self, init_data: Option<&str>) -> Result<Authenticated, AuthError>;
}

/// Verifies payloads with the bot token.
#[derive(Clone)]
pub struct TelegramProvider {
    bot_token: String,
    max_age: Duration,
}

impl TelegramProvider {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

impl fmt::Debug for TelegramProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramProvider")
            .field("bot_token", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl AuthProvider for TelegramProvider {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn authenticate(&self, init_data: Option<&str>) -> Result<Authenticated, AuthError> {
        let raw = init_data
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingInitData)?;

        let data = verify_at(raw, &self.bot_token, OffsetDateTime::now_utc(), self.max_age)?;
        Ok(Authenticated {
            init_data: raw.to_string(),
            user: data.user(),
        })
    }
}

/// Development provider: no validation, mock identity as a fallback.
#[derive(Debug, Clone)]
pub struct StubProvider {
    init_data: String,
}

impl StubProvider {
    /// Use a fixed payload whenever a request carries none.
    pub fn new(init_data: impl Into<String>) -> Self {
        Self {
            init_data: init_data.into(),
        }
    }

    /// Generate a payload for `user`, signed with `bot_token` so a backend
    /// sharing the token accepts it too.
    pub fn for_user(user: &TelegramUser, bot_token: &str) -> Self {
        let user_json = serde_json::to_string(user).unwrap_or_else(|_| {
            format!(r#"{{"id":{},"first_name":"{}"}}"#, user.id, user.first_name)
        });
        let payload = sign_fields(
            [
                (
                    "auth_date",
                    OffsetDateTime::now_utc().unix_timestamp().to_string(),
                ),
                ("query_id", "stub".to_string()),
                ("user", user_json),
            ],
            bot_token,
        );
        Self::new(payload)
    }

    /// The identity used when nothing else is configured.
    pub fn default_user() -> TelegramUser {
        TelegramUser {
            id: 1,
            first_name: "Dev".to_string(),
            last_name: None,
            username: Some("dev".to_string()),
            language_code: Some("en".to_string()),
            is_premium: false,
            photo_url: None,
        }
    }

    pub fn init_data(&self) -> &str {
        &self.init_data
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::for_user(&Self::default_user(), "stub")
    }
}

impl AuthProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn authenticate(&self, init_data: Option<&str>) -> Result<Authenticated, AuthError> {
        let raw = init_data
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.init_data.as_str());
        Ok(Authenticated {
            init_data: raw.to_string(),
            user: extract_user(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::validate;

    const BOT_TOKEN: &str = "42:provider-test";

    #[test]
    fn telegram_provider_accepts_signed_payload() {
        let stub = StubProvider::for_user(&StubProvider::default_user(), BOT_TOKEN);
        let provider = TelegramProvider::new(BOT_TOKEN);
        let auth = provider.authenticate(Some(stub.init_data())).unwrap();
        assert_eq!(auth.user.unwrap().id, 1);
        assert_eq!(auth.init_data, stub.init_data());
    }

    #[test]
    fn telegram_provider_rejects_missing_and_forged() {
        let provider = TelegramProvider::new(BOT_TOKEN);
        assert_eq!(
            provider.authenticate(None).unwrap_err(),
            AuthError::MissingInitData
        );
        assert_eq!(
            provider.authenticate(Some("   ")).unwrap_err(),
            AuthError::MissingInitData
        );

        let forged = StubProvider::for_user(&StubProvider::default_user(), "other-token");
        assert_eq!(
            provider.authenticate(Some(forged.init_data())).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn stub_provider_substitutes_mock_identity() {
        let stub = StubProvider::default();
        let auth = stub.authenticate(None).unwrap();
        assert_eq!(auth.user.unwrap().username.as_deref(), Some("dev"));
        assert!(validate(&auth.init_data, "stub"));
    }

    #[test]
    fn stub_provider_passes_through_supplied_payload() {
        let stub = StubProvider::new("user=%7B%22id%22%3A7%7D&auth_date=1");
        let auth = stub.authenticate(Some("user=%7B%22id%22%3A9%7D&auth_date=1")).unwrap();
        assert_eq!(auth.user.unwrap().id, 9);
    }

    #[test]
    fn debug_output_redacts_token() {
        let provider = TelegramProvider::new("secret-token");
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
