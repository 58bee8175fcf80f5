//! Telegram Mini App `initData` parsing.
//!
//! The payload is a URL-encoded query string, e.g.
//!
//! ```text
//! query_id=AAH...&user=%7B%22id%22%3A1...%7D&auth_date=1700000000&hash=9f1c...
//! ```
//!
//! Parsing does **not** imply the payload is authentic. Run it through
//! [`crate::signature::verify`] before trusting anything read from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AuthError;

/// The Telegram user embedded in `initData` as a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl TelegramUser {
    /// `@username` when present, otherwise the full name.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("@{username}");
        }
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// A parsed `initData` payload.
///
/// Fields other than `hash` are kept in a sorted map, which is exactly the
/// order the data-check string needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: BTreeMap<String, String>,
    hash: Option<String>,
}

impl InitData {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::MissingInitData);
        }

        let mut fields = BTreeMap::new();
        let mut hash = None;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                return Err(AuthError::malformed("empty field name"));
            }
            if key == "hash" {
                hash = Some(value.into_owned());
                continue;
            }
            let key = key.into_owned();
            if fields.contains_key(&key) {
                return Err(AuthError::malformed(format!("duplicate field `{key}`")));
            }
            fields.insert(key, value.into_owned());
        }

        if fields.is_empty() {
            return Err(AuthError::malformed("no fields"));
        }

        Ok(Self { fields, hash })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The supplied signature, hex encoded.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Seconds since the epoch at which Telegram issued the payload.
    pub fn auth_date_unix(&self) -> Result<i64, AuthError> {
        let raw = self
            .get("auth_date")
            .ok_or(AuthError::MissingField { field: "auth_date" })?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| AuthError::malformed("auth_date is not a number"))
    }

    pub fn auth_date(&self) -> Result<OffsetDateTime, AuthError> {
        let unix = self.auth_date_unix()?;
        OffsetDateTime::from_unix_timestamp(unix)
            .map_err(|_| AuthError::malformed("auth_date is out of range"))
    }

    pub fn query_id(&self) -> Option<&str> {
        self.get("query_id")
    }

    /// The `startapp` parameter the Mini App was opened with.
    pub fn start_param(&self) -> Option<&str> {
        self.get("start_param")
    }

    /// The embedded user, if present and well-formed.
    pub fn user(&self) -> Option<TelegramUser> {
        let raw = self.get("user")?;
        match serde_json::from_str(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "initData user field is not valid JSON");
                None
            }
        }
    }

    /// `key=value` lines for every field except `hash`, sorted by key and
    /// joined with `\n`.
    pub fn data_check_string(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Read the user out of a payload without checking its signature.
///
/// Callers must validate the payload first if the identity is going to be
/// trusted for anything beyond display.
pub fn extract_user(raw: &str) -> Option<TelegramUser> {
    InitData::parse(raw).ok()?.user()
}
