// Tracing setup. The filter starts from `LoggingConfig::default()` and is
// swapped for the loaded configuration once it is known.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Crates whose events follow `logging.level`. Everything else uses
/// `logging.dependencies`.
const OWN_TARGETS: &[&str] = &["tgvpn_server", "tgvpn_auth", "tgvpn_api", "tower_http"];

/// Filter directives for `logging`, e.g. `warn,tgvpn_server=debug,...`.
pub fn directives(logging: &LoggingConfig) -> String {
    let level = logging.level.to_ascii_lowercase();
    let mut out = logging.dependencies.to_ascii_lowercase();
    for target in OWN_TARGETS {
        out.push_str(&format!(",{target}={level}"));
    }
    out
}

fn filter_for(logging: &LoggingConfig) -> EnvFilter {
    // RUST_LOG, when set and valid, wins over the configured levels.
    std::env::var_os("RUST_LOG")
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(directives(logging)))
}

pub fn init_tracing() {
    let (reload_layer, handle) = reload::Layer::new(filter_for(&LoggingConfig::default()));
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switch to the configured levels.
pub fn apply_logging(logging: &LoggingConfig) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return;
    };
    match handle.modify(|f| *f = EnvFilter::new(directives(logging))) {
        Ok(()) => tracing::debug!(
            level = %logging.level,
            dependencies = %logging.dependencies,
            "logging levels applied"
        ),
        Err(e) => tracing::warn!(error = %e, "failed to apply logging level"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_crates_follow_level_and_the_rest_stay_quiet() {
        let logging = LoggingConfig {
            level: "DEBUG".into(),
            dependencies: "warn".into(),
        };
        assert_eq!(
            directives(&logging),
            "warn,tgvpn_server=debug,tgvpn_auth=debug,tgvpn_api=debug,tower_http=debug"
        );
    }

    #[test]
    fn defaults_parse_as_a_filter() {
        let text = directives(&LoggingConfig::default());
        assert!(text.starts_with("warn,"));
        assert!(EnvFilter::try_new(text).is_ok());
    }
}
