//! Shared default header set.
//!
//! Every client created from the same [`ClientRegistry`](crate::client::ClientRegistry)
//! reads the same [`DefaultHeaders`]. Only the URL signer replaces the
//! `User-Agent`; everything else reads snapshots.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::constants::{DEFAULT_REQUEST_HEADERS, DEFAULT_USER_AGENT};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

const USER_AGENT: &str = "User-Agent";

// ============================================================================
// DefaultHeaders
// ============================================================================

/// Header set applied to every outbound request.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone)]
pub struct DefaultHeaders {
    inner: Arc<RwLock<FxHashMap<String, String>>>,
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultHeaders {
    /// Creates a header set seeded from the default header table.
    #[must_use]
    pub fn new() -> Self {
        let map = DEFAULT_REQUEST_HEADERS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().get(name).cloned()
    }

    /// Returns the current `User-Agent`.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.get(USER_AGENT)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Replaces the `User-Agent`.
    ///
    /// Crate-private: the URL signer is the only writer.
    pub(crate) fn set_user_agent(&self, user_agent: impl Into<String>) {
        let user_agent = user_agent.into();
        debug!(user_agent = %user_agent, "Default User-Agent replaced");
        self.inner.write().insert(USER_AGENT.to_string(), user_agent);
    }

    /// Returns a copy of the current set.
    #[must_use]
    pub fn snapshot(&self) -> FxHashMap<String, String> {
        self.inner.read().clone()
    }

    /// Converts the current set into a [`HeaderMap`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a name or value is not a valid header.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let guard = self.inner.read();
        let mut map = HeaderMap::with_capacity(guard.len());

        for (name, value) in guard.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid value for {name}: {e}")))?;
            map.insert(name, value);
        }

        Ok(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
