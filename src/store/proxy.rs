//! Outbound proxy configuration and rotating pool.
//!
//! # Example
//!
//! ```
//! use webcast_live::{ProxyConfig, ProxyPool, ProxySettings, RotationPolicy};
//!
//! let settings = ProxySettings::new(vec![
//!     ProxyConfig::http("proxy-a.example.com", 8080),
//!     ProxyConfig::socks5("proxy-b.example.com", 1080).with_credentials("user", "pass"),
//! ])
//! .with_policy(RotationPolicy::RoundRobin);
//!
//! let pool = ProxyPool::new(&settings);
//! assert_eq!(pool.next_proxy().unwrap().host, "proxy-a.example.com");
//! assert_eq!(pool.next_proxy().unwrap().host, "proxy-b.example.com");
//! ```

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// ProxyType
// ============================================================================

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// HTTP proxy (or SSL CONNECT for HTTPS).
    #[default]
    Http,

    /// HTTP proxying over TLS connection to proxy.
    Https,

    /// SOCKS v5 proxy.
    #[serde(rename = "socks")]
    Socks5,
}

impl ProxyType {
    /// Returns the URL scheme for this proxy type.
    ///
    /// `proxy_dns` selects `socks5h` so that name resolution happens at the proxy.
    #[inline]
    #[must_use]
    pub fn scheme(&self, proxy_dns: bool) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks5 if proxy_dns => "socks5h",
            Self::Socks5 => "socks5",
        }
    }
}

// ============================================================================
// ProxyConfig
// ============================================================================

/// One proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy type.
    #[serde(rename = "type", default)]
    pub proxy_type: ProxyType,

    /// Proxy hostname.
    pub host: String,

    /// Proxy port.
    pub port: u16,

    /// Username for authentication (optional).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,

    /// Password for authentication (optional).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,

    /// Whether to proxy DNS queries (SOCKS5 only).
    #[serde(rename = "proxyDns", default)]
    pub proxy_dns: bool,
}

impl ProxyConfig {
    /// Creates a new proxy configuration.
    #[must_use]
    pub fn new(proxy_type: ProxyType, host: impl Into<String>, port: u16) -> Self {
        Self {
            proxy_type,
            host: host.into(),
            port,
            username: None,
            password: None,
            proxy_dns: false,
        }
    }

    /// Creates an HTTP proxy configuration.
    #[inline]
    #[must_use]
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::new(ProxyType::Http, host, port)
    }

    /// Creates an HTTPS proxy configuration.
    #[inline]
    #[must_use]
    pub fn https(host: impl Into<String>, port: u16) -> Self {
        Self::new(ProxyType::Https, host, port)
    }

    /// Creates a SOCKS5 proxy configuration.
    #[inline]
    #[must_use]
    pub fn socks5(host: impl Into<String>, port: u16) -> Self {
        Self::new(ProxyType::Socks5, host, port)
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Enables DNS proxying (SOCKS5 only).
    #[must_use]
    pub fn with_proxy_dns(mut self, proxy_dns: bool) -> Self {
        self.proxy_dns = proxy_dns;
        self
    }

    /// Returns `true` if this proxy has authentication configured.
    #[inline]
    #[must_use]
    pub fn has_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Returns the proxy URL without credentials.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.proxy_type.scheme(self.proxy_dns),
            self.host,
            self.port
        )
    }

    /// Converts into a [`reqwest::Proxy`] applied to all schemes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the proxy URL is invalid.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let proxy = reqwest::Proxy::all(self.url())
            .map_err(|e| Error::config(format!("Invalid proxy {}: {e}", self.url())))?;

        Ok(match (&self.username, &self.password) {
            (Some(user), Some(pass)) => proxy.basic_auth(user, pass),
            _ => proxy,
        })
    }
}

// ============================================================================
// RotationPolicy
// ============================================================================

/// How [`ProxyPool::next_proxy`] picks an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Advance to the next live entry on every call.
    #[default]
    RoundRobin,
    /// Keep returning the same entry until it is marked failed.
    PinUntilFail,
}

// ============================================================================
// ProxySettings
// ============================================================================

/// Proxy part of the connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Endpoints in rotation order.
    pub proxies: Vec<ProxyConfig>,

    /// Rotation policy.
    #[serde(default)]
    pub policy: RotationPolicy,
}

impl ProxySettings {
    /// Creates settings for the given endpoints with round-robin rotation.
    #[must_use]
    pub fn new(proxies: Vec<ProxyConfig>) -> Self {
        Self {
            proxies,
            policy: RotationPolicy::default(),
        }
    }

    /// Sets the rotation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// ============================================================================
// ProxyEntry
// ============================================================================

/// Proxy endpoint plus its liveness and usage state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEntry {
    /// Endpoint.
    pub config: ProxyConfig,
    /// `false` once the entry has been marked failed.
    pub alive: bool,
    /// Times this entry was handed out.
    pub uses: u64,
    /// Times this entry was marked failed.
    pub failures: u32,
}

impl ProxyEntry {
    fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            alive: true,
            uses: 0,
            failures: 0,
        }
    }
}

// ============================================================================
// ProxyPool
// ============================================================================

struct PoolState {
    entries: Vec<ProxyEntry>,
    cursor: usize,
}

/// Rotating pool of outbound proxies.
///
/// Thread-safe. When every entry has failed, [`next_proxy`](Self::next_proxy)
/// returns `None` and callers go direct.
pub struct ProxyPool {
    policy: RotationPolicy,
    state: Mutex<PoolState>,
}

impl ProxyPool {
    /// Creates a pool from proxy settings.
    #[must_use]
    pub fn new(settings: &ProxySettings) -> Self {
        Self {
            policy: settings.policy,
            state: Mutex::new(PoolState {
                entries: settings
                    .proxies
                    .iter()
                    .cloned()
                    .map(ProxyEntry::new)
                    .collect(),
                cursor: 0,
            }),
        }
    }

    /// Returns the rotation policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Returns the next proxy to use, or `None` if no entry is alive.
    pub fn next_proxy(&self) -> Option<ProxyConfig> {
        let mut state = self.state.lock();
        let len = state.entries.len();
        let start = state.cursor;

        let index = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| state.entries[i].alive)?;

        state.cursor = match self.policy {
            RotationPolicy::RoundRobin => (index + 1) % len,
            RotationPolicy::PinUntilFail => index,
        };

        let entry = &mut state.entries[index];
        entry.uses += 1;
        Some(entry.config.clone())
    }

    /// Marks an endpoint as failed so rotation skips it.
    pub fn mark_failed(&self, proxy: &ProxyConfig) {
        let mut state = self.state.lock();
        let Some(index) = state.entries.iter().position(|e| e.config == *proxy) else {
            debug!(proxy = %proxy.url(), "Failure reported for unknown proxy");
            return;
        };

        let entry = &mut state.entries[index];
        entry.alive = false;
        entry.failures += 1;

        warn!(proxy = %proxy.url(), failures = entry.failures, "Proxy marked failed");

        if self.policy == RotationPolicy::PinUntilFail && state.cursor == index {
            state.cursor = (index + 1) % state.entries.len();
        }
    }

    /// Marks every entry alive again.
    pub fn revive_all(&self) {
        let mut state = self.state.lock();
        for entry in &mut state.entries {
            entry.alive = true;
        }
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.state.lock().entries.iter().filter(|e| e.alive).count()
    }

    /// Returns a copy of every entry with its state.
    #[must_use]
    pub fn entries(&self) -> Vec<ProxyEntry> {
        self.state.lock().entries.clone()
    }
}

impl std::fmt::Debug for ProxyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyPool")
            .field("policy", &self.policy)
            .field("alive", &self.alive_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
