use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tgvpn_auth::{AuthProvider, StubProvider, TelegramProvider};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream VPN service
    #[serde(default)]
    pub backend: BackendConfig,
    /// How inbound init data is authenticated
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.request_timeout_ms == 0 {
            return Err("server.request_timeout_ms must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Backend validations
        if self.backend.timeout_ms == 0 {
            return Err("backend.timeout_ms must be > 0".into());
        }
        match url::Url::parse(&self.backend.base_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => {
                return Err(format!(
                    "backend.base_url must use http or https, got `{}`",
                    u.scheme()
                ));
            }
            Err(e) => return Err(format!("backend.base_url is not a valid URL: {e}")),
        }
        if !self.backend.api_prefix.is_empty() && !self.backend.api_prefix.starts_with('/') {
            return Err("backend.api_prefix must start with '/'".into());
        }
        // Auth validations
        if self.auth.provider == AuthProviderKind::Telegram && self.auth.bot_token.trim().is_empty()
        {
            return Err("auth.provider = \"telegram\" requires auth.bot_token".into());
        }
        if self.auth.max_age_secs == 0 {
            return Err("auth.max_age_secs must be > 0".into());
        }
        // Logging validation
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        for (key, value) in [
            ("logging.level", &self.logging.level),
            ("logging.dependencies", &self.logging.dependencies),
        ] {
            if !valid_levels.contains(&value.to_ascii_lowercase().as_str()) {
                return Err(format!("{key} must be one of {valid_levels:?}"));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Upper bound for a whole request, backend round trip included.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Versioned prefix prepended to every forwarded path.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Sent as `X-Api-Key`. Never exposed to browsers.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_api_prefix() -> String {
    "/v1".into()
}
fn default_backend_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_prefix: default_api_prefix(),
            api_key: None,
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    #[default]
    Telegram,
    /// Development only: accepts any payload.
    Stub,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub provider: AuthProviderKind,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Payload the stub provider substitutes when a request carries none.
    /// Generated for a mock user when unset.
    #[serde(default)]
    pub stub_init_data: Option<String>,
}

fn default_max_age_secs() -> u64 {
    86_400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: AuthProviderKind::default(),
            bot_token: String::new(),
            max_age_secs: default_max_age_secs(),
            stub_init_data: None,
        }
    }
}

impl AuthConfig {
    /// Instantiate the configured provider.
    pub fn build_provider(&self) -> Arc<dyn AuthProvider> {
        match self.provider {
            AuthProviderKind::Telegram => {
                let max_age = time::Duration::seconds(self.max_age_secs as i64);
                Arc::new(TelegramProvider::new(self.bot_token.clone()).with_max_age(max_age))
            }
            AuthProviderKind::Stub => {
                let stub = match self.stub_init_data.as_deref().filter(|s| !s.is_empty()) {
                    Some(payload) => StubProvider::new(payload),
                    None if !self.bot_token.is_empty() => {
                        StubProvider::for_user(&StubProvider::default_user(), &self.bot_token)
                    }
                    None => StubProvider::default(),
                };
                Arc::new(stub)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for this server's own events.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Level for third-party crates (hyper, reqwest, ...).
    #[serde(default = "default_dependency_level")]
    pub dependencies: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_dependency_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dependencies: default_dependency_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "tgvpn.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TGVPN__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TGVPN")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
