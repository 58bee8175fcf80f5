//! `initData` signature validation.
//!
//! Telegram signs the payload in two HMAC-SHA256 steps:
//!
//! ```text
//! secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! hash       = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every field except `hash`, sorted by key and
//! rendered as `key=value` lines joined with `\n`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

use crate::error::AuthError;
use crate::init_data::InitData;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation key used to derive the secret key from the bot token.
pub const WEB_APP_DATA_KEY: &str = "WebAppData";

/// Payloads older than this are rejected.
pub const DEFAULT_MAX_AGE: Duration = Duration::hours(24);

fn payload_mac(data_check_string: &str, bot_token: &str) -> HmacSha256 {
    let mut derive = HmacSha256::new_from_slice(WEB_APP_DATA_KEY.as_bytes())
        .expect("HMAC can take key of any size");
    derive.update(bot_token.as_bytes());
    let secret_key = derive.finalize().into_bytes();

    let mut mac =
        HmacSha256::new_from_slice(&secret_key).expect("HMAC can take key of any size");
    mac.update(data_check_string.as_bytes());
    mac
}

/// Check signature and freshness, returning the parsed payload on success.
pub fn verify_at(
    payload: &str,
    bot_token: &str,
    now: OffsetDateTime,
    max_age: Duration,
) -> Result<InitData, AuthError> {
    if bot_token.is_empty() {
        return Err(AuthError::configuration("bot token is empty"));
    }

    let data = InitData::parse(payload)?;
    let supplied = data.hash().ok_or(AuthError::MissingField { field: "hash" })?;
    let issued_at = data.auth_date()?;

    if now - issued_at > max_age {
        return Err(AuthError::Expired);
    }

    // hex::decode accepts either case, so the comparison is case-insensitive.
    let supplied = hex::decode(supplied.trim()).map_err(|_| AuthError::InvalidSignature)?;
    payload_mac(&data.data_check_string(), bot_token)
        .verify_slice(&supplied)
        .map_err(|_| AuthError::InvalidSignature)?;

    Ok(data)
}

/// [`verify_at`] against the current clock and the default 24h window.
pub fn verify(payload: &str, bot_token: &str) -> Result<InitData, AuthError> {
    verify_at(payload, bot_token, OffsetDateTime::now_utc(), DEFAULT_MAX_AGE)
}

/// Boolean form of [`verify`]. Never fails; the reason is logged.
pub fn validate(payload: &str, bot_token: &str) -> bool {
    validate_at(payload, bot_token, OffsetDateTime::now_utc())
}

pub fn validate_at(payload: &str, bot_token: &str, now: OffsetDateTime) -> bool {
    if payload.is_empty() || bot_token.is_empty() {
        return false;
    }
    match verify_at(payload, bot_token, now, DEFAULT_MAX_AGE) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(reason = %e, "initData rejected");
            false
        }
    }
}

/// Build a correctly signed payload from `fields`.
///
/// Used by the development stub and by tests; a `hash` entry in `fields` is
/// ignored.
pub fn sign_fields<I, K, V>(fields: I, bot_token: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let sorted: std::collections::BTreeMap<String, String> = fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, _)| k != "hash")
        .collect();

    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");
    let hash = hex::encode(payload_mac(&data_check_string, bot_token).finalize().into_bytes());

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &sorted {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}
