//! Connection settings and their builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use webcast_live::ConnectionSettings;
//!
//! let settings = ConnectionSettings::builder()
//!     .timeout(Duration::from_secs(10))
//!     .client_language("de-DE")
//!     .socket_buffer_size(64_000)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(settings.socket_buffer_size, 64_000);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::store::ProxySettings;

use super::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_LANGUAGE, DEFAULT_POLLING_INTERVAL, DEFAULT_TIMEOUT,
    SIGN_API_URL, WEB_URL, WEBCAST_API_URL,
};

// ============================================================================
// ConnectionSettings
// ============================================================================

/// Settings for one client.
///
/// Created once at client construction and never changed afterwards.
/// Deserializable so that an external configuration loader can produce it;
/// durations are expressed in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConnectionSettings {
    /// Timeout for every outbound HTTP call and the transport handshake.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Polling interval for consumers that fall back to polling.
    #[serde(rename = "polling_interval_ms", with = "duration_ms")]
    pub polling_interval: Duration,

    /// Language tag applied to `app_language` and `browser_language`.
    pub client_language: String,

    /// Whether the dispatch layer should fetch room info on connect.
    pub fetch_room_info_on_connect: bool,

    /// Whether messages returned by the initial room fetch are delivered.
    pub handle_existing_messages_on_connect: bool,

    /// Whether the dispatch layer should download the gift catalog.
    pub download_gift_info: bool,

    /// Outbound proxies, if any.
    pub proxy: Option<ProxySettings>,

    /// Maximum size of one received message in bytes.
    pub socket_buffer_size: usize,

    /// URL-signing service endpoint.
    pub sign_api_url: String,

    /// Base path of the webcast API.
    pub webcast_api_url: String,

    /// Public web origin.
    pub web_url: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            client_language: DEFAULT_LANGUAGE.to_string(),
            fetch_room_info_on_connect: true,
            handle_existing_messages_on_connect: true,
            download_gift_info: true,
            proxy: None,
            socket_buffer_size: DEFAULT_BUFFER_SIZE,
            sign_api_url: SIGN_API_URL.to_string(),
            webcast_api_url: WEBCAST_API_URL.to_string(),
            web_url: WEB_URL.to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Creates a builder starting from the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionSettingsBuilder {
        ConnectionSettingsBuilder::new()
    }

    /// Checks the settings for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the timeout or buffer size is zero
    /// - [`Error::Config`] if an endpoint is not an absolute URL
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }

        if self.socket_buffer_size == 0 {
            return Err(Error::config("socket_buffer_size must be greater than zero"));
        }

        if self.client_language.trim().is_empty() {
            return Err(Error::config("client_language must not be empty"));
        }

        for (name, value) in [
            ("sign_api_url", &self.sign_api_url),
            ("webcast_api_url", &self.webcast_api_url),
            ("web_url", &self.web_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::config(format!("{name} is not a valid URL ({value}): {e}")))?;
        }

        if let Some(proxy) = &self.proxy
            && proxy.proxies.is_empty()
        {
            return Err(Error::config(
                "proxy settings given without any proxy endpoint",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// ConnectionSettingsBuilder
// ============================================================================

/// Builder for [`ConnectionSettings`].
#[derive(Debug, Default, Clone)]
pub struct ConnectionSettingsBuilder {
    settings: ConnectionSettings,
}

impl ConnectionSettingsBuilder {
    /// Creates a builder starting from the defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP and handshake timeout.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.settings.polling_interval = interval;
        self
    }

    /// Sets the client language tag.
    #[inline]
    #[must_use]
    pub fn client_language(mut self, language: impl Into<String>) -> Self {
        self.settings.client_language = language.into();
        self
    }

    /// Sets whether room info is fetched on connect.
    #[inline]
    #[must_use]
    pub fn fetch_room_info_on_connect(mut self, enabled: bool) -> Self {
        self.settings.fetch_room_info_on_connect = enabled;
        self
    }

    /// Sets whether messages from the initial room fetch are delivered.
    #[inline]
    #[must_use]
    pub fn handle_existing_messages_on_connect(mut self, enabled: bool) -> Self {
        self.settings.handle_existing_messages_on_connect = enabled;
        self
    }

    /// Sets whether the gift catalog is downloaded.
    #[inline]
    #[must_use]
    pub fn download_gift_info(mut self, enabled: bool) -> Self {
        self.settings.download_gift_info = enabled;
        self
    }

    /// Sets the outbound proxies.
    #[inline]
    #[must_use]
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.settings.proxy = Some(proxy);
        self
    }

    /// Sets the receive buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn socket_buffer_size(mut self, size: usize) -> Self {
        self.settings.socket_buffer_size = size;
        self
    }

    /// Overrides the URL-signing endpoint.
    #[inline]
    #[must_use]
    pub fn sign_api_url(mut self, url: impl Into<String>) -> Self {
        self.settings.sign_api_url = url.into();
        self
    }

    /// Overrides the webcast API base path.
    #[inline]
    #[must_use]
    pub fn webcast_api_url(mut self, url: impl Into<String>) -> Self {
        self.settings.webcast_api_url = url.into();
        self
    }

    /// Overrides the public web origin.
    #[inline]
    #[must_use]
    pub fn web_url(mut self, url: impl Into<String>) -> Self {
        self.settings.web_url = url.into();
        self
    }

    /// Builds the settings with validation.
    ///
    /// # Errors
    ///
    /// See [`ConnectionSettings::validate`].
    pub fn build(self) -> Result<ConnectionSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    use crate::store::ProxyConfig;

    #[test]
    fn test_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(20));
        assert_eq!(settings.polling_interval, Duration::from_millis(500));
        assert_eq!(settings.client_language, "en-US");
        assert!(settings.fetch_room_info_on_connect);
        assert!(settings.handle_existing_messages_on_connect);
        assert!(settings.download_gift_info);
        assert!(settings.proxy.is_none());
        assert_eq!(settings.socket_buffer_size, 200_000);
        assert_ok!(settings.validate());
    }

    #[test]
    fn test_builder_sets_fields() {
        let settings = ConnectionSettings::builder()
            .timeout(Duration::from_secs(20))
            .socket_buffer_size(10_000)
            .handle_existing_messages_on_connect(false)
            .proxy(ProxySettings::new(vec![ProxyConfig::http("p", 8080)]))
            .build()
            .unwrap();

        assert_eq!(settings.socket_buffer_size, 10_000);
        assert!(!settings.handle_existing_messages_on_connect);
        assert_eq!(settings.proxy.unwrap().proxies.len(), 1);
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let err = ConnectionSettings::builder()
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_build_rejects_zero_buffer() {
        let err = ConnectionSettings::builder()
            .socket_buffer_size(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("socket_buffer_size"));
    }

    #[test]
    fn test_build_rejects_relative_endpoint() {
        let result = ConnectionSettings::builder().sign_api_url("/sign").build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_rejects_empty_proxy_list() {
        assert_err!(
            ConnectionSettings::builder()
                .proxy(ProxySettings::default())
                .build()
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"timeout_ms": 5000, "socket_buffer_size": 10000, "client_language": "fr-FR"}"#;
        let settings: ConnectionSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.socket_buffer_size, 10_000);
        assert_eq!(settings.client_language, "fr-FR");
        assert_eq!(settings.polling_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_serialize_uses_millis() {
        let json = serde_json::to_value(ConnectionSettings::default()).unwrap();
        assert_eq!(json["timeout_ms"], 20_000);
        assert_eq!(json["polling_interval_ms"], 500);
    }
}
