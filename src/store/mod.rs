//! Credential and proxy store.
//!
//! Holds the session cookies and the rotating proxy pool that outbound
//! requests and the transport handshake draw from.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cookies` | Ordered session cookie jar |
//! | `proxy` | Proxy endpoints and rotation |

// ============================================================================
// Submodules
// ============================================================================

/// Session cookie jar.
pub mod cookies;

/// Proxy configuration and rotating pool.
pub mod proxy;

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;

// ============================================================================
// Re-exports
// ============================================================================

pub use cookies::CookieJar;
pub use proxy::{ProxyConfig, ProxyEntry, ProxyPool, ProxySettings, ProxyType, RotationPolicy};

// ============================================================================
// CredentialStore
// ============================================================================

/// Cookies and proxies for one client.
#[derive(Debug, Default)]
pub struct CredentialStore {
    cookies: Mutex<CookieJar>,
    proxies: Option<ProxyPool>,
}

impl CredentialStore {
    /// Creates a store with an empty jar and an optional proxy pool.
    #[must_use]
    pub fn new(proxy: Option<&ProxySettings>) -> Self {
        Self {
            cookies: Mutex::new(CookieJar::new()),
            proxies: proxy.map(ProxyPool::new),
        }
    }

    /// Sets a session cookie.
    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.lock().set(name, value);
    }

    /// Absorbs `Set-Cookie` header values from a response.
    pub fn absorb_set_cookies<'a>(&self, headers: impl IntoIterator<Item = &'a str>) {
        let mut jar = self.cookies.lock();
        for header in headers {
            jar.absorb_set_cookie(header);
        }
    }

    /// Returns the accumulated cookies as one header value.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.cookies.lock().header_value()
    }

    /// Returns a copy of the cookie jar.
    #[must_use]
    pub fn cookies(&self) -> CookieJar {
        self.cookies.lock().clone()
    }

    /// Returns the next proxy from the pool, if any.
    #[must_use]
    pub fn next_proxy(&self) -> Option<ProxyConfig> {
        self.proxies.as_ref().and_then(ProxyPool::next_proxy)
    }

    /// Reports a proxy as failed.
    pub fn mark_proxy_failed(&self, proxy: &ProxyConfig) {
        if let Some(pool) = &self.proxies {
            pool.mark_failed(proxy);
        }
    }

    /// Returns the proxy pool, if configured.
    #[must_use]
    pub fn proxy_pool(&self) -> Option<&ProxyPool> {
        self.proxies.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
