//! Wire types shared by the TgVPN proxy service and its clients.
//!
//! Every proxy endpoint answers with one of two JSON shapes:
//!
//! ```text
//! 200..299  { "ok": true, ...payload }
//! 4xx/5xx   { "error": "human readable message" }
//! ```
//!
//! Payloads that are not JSON objects (lists, scalars) are wrapped as
//! `{ "ok": true, "data": <payload> }` so the envelope is always an object.

pub mod error;
pub mod messages;

pub use error::{
    ErrorBody, ErrorKind, ErrorResponse, SERVICE_UNAVAILABLE_MESSAGE, extract_message,
};
pub use messages::{GENERIC_MESSAGE, friendly_message, user_message};

use serde_json::{Map, Value};

/// Header carrying the signed Telegram init data.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// Wrap a successful payload into the `{ ok: true, ... }` envelope.
pub fn ok_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("ok".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        Value::Null => {
            let mut map = Map::new();
            map.insert("ok".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("ok".to_string(), Value::Bool(true));
            map.insert("data".to_string(), other);
            Value::Object(map)
        }
    }
}

/// Undo [`ok_envelope`]: drop the `ok` flag and unwrap a lone `data` member.
pub fn open_envelope(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    map.remove("ok");
    if map.len() == 1 && map.contains_key("data") {
        return map.remove("data").unwrap_or(Value::Null);
    }
    Value::Object(map)
}

/// Returns the `error` message if the body is an explicit `{ ok: false }` envelope.
pub fn envelope_failure(value: &Value) -> Option<String> {
    if value.get("ok").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let message = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or(GENERIC_MESSAGE);
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_payload_gets_ok_flag() {
        let wrapped = ok_envelope(json!({ "status": "active" }));
        assert_eq!(wrapped, json!({ "ok": true, "status": "active" }));
    }

    #[test]
    fn list_payload_is_wrapped_in_data() {
        let wrapped = ok_envelope(json!([1, 2, 3]));
        assert_eq!(wrapped, json!({ "ok": true, "data": [1, 2, 3] }));
        assert_eq!(open_envelope(wrapped), json!([1, 2, 3]));
    }

    #[test]
    fn null_payload_becomes_bare_ok() {
        assert_eq!(ok_envelope(Value::Null), json!({ "ok": true }));
    }

    #[test]
    fn open_envelope_keeps_other_members() {
        let opened = open_envelope(json!({ "ok": true, "data": 1, "total": 2 }));
        assert_eq!(opened, json!({ "data": 1, "total": 2 }));
    }

    #[test]
    fn explicit_failure_envelope_is_detected() {
        assert_eq!(
            envelope_failure(&json!({ "ok": false, "error": "Tariff not found" })),
            Some("Tariff not found".to_string())
        );
        assert_eq!(envelope_failure(&json!({ "ok": true })), None);
        assert_eq!(envelope_failure(&json!({ "status": "x" })), None);
    }
}
