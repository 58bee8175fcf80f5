//! Authentication error types.

/// Reasons an init data payload is rejected.
///
/// The `Display` strings are sent to browsers as the `{ error }` message, so
/// they never include the payload or the bot token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No payload was supplied at all.
    #[error("Missing Telegram initData")]
    MissingInitData,

    /// The payload is not a `key=value&...` string.
    #[error("Malformed Telegram initData: {message}")]
    Malformed {
        /// What was wrong with it.
        message: String,
    },

    /// A mandatory field is absent.
    #[error("Telegram initData is missing `{field}`")]
    MissingField {
        /// The absent field.
        field: &'static str,
    },

    /// `auth_date` is older than the freshness window.
    #[error("Telegram initData expired")]
    Expired,

    /// The `hash` does not match the payload.
    #[error("Invalid Telegram initData signature")]
    InvalidSignature,

    /// The validator itself is misconfigured (e.g. empty bot token).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

impl AuthError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failure is the caller's fault (as opposed to ours).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }
}
