//! Typed payloads exchanged with the proxy.
//!
//! Fields are lenient (`#[serde(default)]`) because the backend omits empty
//! members rather than sending nulls.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept identifiers sent either as JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

/// `GET user/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub user_id: Option<i64>,
    /// `active`, `expired` or `none`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub autorenewal: Option<bool>,
    #[serde(default)]
    pub trial_available: Option<bool>,
    #[serde(default)]
    pub balance: Option<f64>,
}

/// `GET user/config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnConfig {
    #[serde(default, alias = "config", alias = "vpn_key")]
    pub key: Option<String>,
    #[serde(default)]
    pub subscription_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<u32>,
}

/// `GET tariffs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffList {
    #[serde(default)]
    pub tariffs: Vec<Tariff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tariff_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `GET payments`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistory {
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub total: u64,
}

/// `POST orders` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub tariff_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl CreateOrder {
    pub fn new(tariff_id: impl Into<String>) -> Self {
        Self {
            tariff_id: tariff_id.into(),
            promo_code: None,
            payment_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "string_or_number")]
    pub order_id: String,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `POST payments/success`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCheck {
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// `GET|POST autorenewal`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRenewal {
    #[serde(default)]
    pub enabled: bool,
}

/// `GET referral/summary`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralSummary {
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub invited_count: u32,
    #[serde(default)]
    pub active_count: u32,
    #[serde(default)]
    pub bonus_days: u32,
    #[serde(default)]
    pub earned: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralFriend {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// `GET referral/friends`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralFriends {
    #[serde(default)]
    pub friends: Vec<ReferralFriend>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prize: Option<String>,
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    /// The caller's tickets.
    #[serde(default)]
    pub tickets: u32,
    #[serde(default)]
    pub participants_count: u32,
}

/// `GET contest/active`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContest {
    #[serde(default)]
    pub contest: Option<Contest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tickets: u32,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// `GET contest/participants`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestParticipants {
    #[serde(default)]
    pub participants: Vec<ContestParticipant>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEntry {
    pub amount: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `GET contest/tickets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestTickets {
    #[serde(default)]
    pub tickets: u32,
    #[serde(default)]
    pub history: Vec<TicketEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tariff_id_accepts_numbers_and_strings() {
        let numeric: Tariff =
            serde_json::from_value(json!({ "id": 3, "name": "Month", "price": 199.0 })).unwrap();
        let textual: Tariff =
            serde_json::from_value(json!({ "id": "m1", "name": "Month", "price": 199 })).unwrap();
        assert_eq!(numeric.id, "3");
        assert_eq!(textual.id, "m1");
        assert_eq!(textual.duration_days, 0);
    }

    #[test]
    fn tariff_id_rejects_objects() {
        let result: Result<Tariff, _> =
            serde_json::from_value(json!({ "id": {}, "name": "x", "price": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn vpn_config_accepts_aliases() {
        let cfg: VpnConfig = serde_json::from_value(json!({ "vpn_key": "vless://abc" })).unwrap();
        assert_eq!(cfg.key.as_deref(), Some("vless://abc"));
    }

    #[test]
    fn create_order_omits_empty_options() {
        let body = serde_json::to_value(CreateOrder::new("7")).unwrap();
        assert_eq!(body, json!({ "tariff_id": "7" }));
    }

    #[test]
    fn envelope_flag_is_ignored() {
        let status: UserStatus =
            serde_json::from_value(json!({ "ok": true, "status": "active" })).unwrap();
        assert_eq!(status.status.as_deref(), Some("active"));
    }
}
