//! User-facing error messages.
//!
//! Technical messages are never shown verbatim to end users. Callers either
//! map an [`ErrorKind`] through [`user_message`], or run an arbitrary
//! technical string through [`friendly_message`].

use crate::error::ErrorKind;

pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

const NETWORK_MESSAGE: &str = "No connection. Check your internet and try again.";
const TIMEOUT_MESSAGE: &str = "The request took too long. Please try again.";
const AUTH_MESSAGE: &str = "Your session has expired. Please reopen the app from Telegram.";
const PERMISSION_MESSAGE: &str = "You don't have access to this action.";
const NOT_FOUND_MESSAGE: &str = "The requested item was not found.";
const SERVER_MESSAGE: &str = "The service is temporarily unavailable. Please try again later.";
const VALIDATION_MESSAGE: &str = "Please check the entered data and try again.";
const PAYMENT_MESSAGE: &str = "The payment could not be processed. Please try again.";
const TARIFF_MESSAGE: &str = "This plan is not available right now. Please pick another one.";

/// Static lookup from error class to the message shown to the user.
pub fn user_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Network => NETWORK_MESSAGE,
        ErrorKind::Auth => AUTH_MESSAGE,
        ErrorKind::Permission => PERMISSION_MESSAGE,
        ErrorKind::NotFound => NOT_FOUND_MESSAGE,
        ErrorKind::Server => SERVER_MESSAGE,
        ErrorKind::Validation => VALIDATION_MESSAGE,
        ErrorKind::Unknown => GENERIC_MESSAGE,
    }
}

// First match wins, so more specific fragments come first.
const REWRITES: &[(&[&str], &str)] = &[
    (&["timed out", "timeout"], TIMEOUT_MESSAGE),
    (
        &["initdata", "unauthorized", "signature", "session expired"],
        AUTH_MESSAGE,
    ),
    (&["forbidden", "permission denied"], PERMISSION_MESSAGE),
    (&["payment", "insufficient funds"], PAYMENT_MESSAGE),
    (&["tariff"], TARIFF_MESSAGE),
    (&["not found"], NOT_FOUND_MESSAGE),
    (
        &[
            "service temporarily unavailable",
            "bad gateway",
            "internal server error",
            "service unavailable",
        ],
        SERVER_MESSAGE,
    ),
    (
        &[
            "failed to fetch",
            "error sending request",
            "connection",
            "network",
            "dns",
        ],
        NETWORK_MESSAGE,
    ),
    (&["invalid", "required", "must be"], VALIDATION_MESSAGE),
];

/// Rewrite a technical message into something presentable.
pub fn friendly_message(technical: &str) -> &'static str {
    let lowered = technical.to_lowercase();
    REWRITES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, message)| *message)
        .unwrap_or(GENERIC_MESSAGE)
}
