//! Client configuration.

use std::time::Duration;

use crate::dispatch::RetryPolicy;

/// How long each resource stays cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub tariffs: Duration,
    pub status: Duration,
    pub vpn_config: Duration,
    pub payments: Duration,
    pub autorenewal: Duration,
    pub referral: Duration,
    pub contest: Duration,
    /// Participants and tickets change faster than the contest itself.
    pub contest_entries: Duration,
}

const MINUTE: Duration = Duration::from_secs(60);

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            tariffs: 5 * MINUTE,
            status: MINUTE,
            vpn_config: 2 * MINUTE,
            payments: MINUTE,
            autorenewal: MINUTE,
            referral: 2 * MINUTE,
            contest: 2 * MINUTE,
            contest_entries: MINUTE,
        }
    }
}

impl CacheTtls {
    /// Same TTL for every resource. Mostly useful in tests.
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            tariffs: ttl,
            status: ttl,
            vpn_config: ttl,
            payments: ttl,
            autorenewal: ttl,
            referral: ttl,
            contest: ttl,
            contest_entries: ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Proxy origin, e.g. `https://vpn.example.com`.
    pub base_url: String,
    /// Path prefix the proxy mounts its endpoints under.
    pub api_prefix: String,
    pub read_policy: RetryPolicy,
    pub write_policy: RetryPolicy,
    pub ttls: CacheTtls,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_prefix: "/api".to_string(),
            read_policy: RetryPolicy::idempotent(),
            write_policy: RetryPolicy::mutating(),
            ttls: CacheTtls::default(),
        }
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_read_policy(mut self, policy: RetryPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    #[must_use]
    pub fn with_write_policy(mut self, policy: RetryPolicy) -> Self {
        self.write_policy = policy;
        self
    }

    #[must_use]
    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Apply the same per-attempt timeout to reads and writes.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.read_policy = self.read_policy.with_timeout(timeout);
        self.write_policy = self.write_policy.with_timeout(timeout);
        self
    }

    /// Full URL of an endpoint path such as `user/status`.
    pub fn url(&self, path: &str) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}/{}", self.base_url, prefix, path)
        }
    }
}
