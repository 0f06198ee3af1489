//! Webcast HTTP API client.
//!
//! Thin layer over [`HttpRequest`] that knows the webcast endpoints, the
//! default client parameters and when to route a URL through the signer.
//!
//! | Method | Endpoint | Body |
//! |--------|----------|------|
//! | [`get_deserialized_message`](WebcastHttpClient::get_deserialized_message) | `webcast/<path>` | protobuf `WebcastResponse` |
//! | [`get_json`](WebcastHttpClient::get_json) | `webcast/<path>` | JSON |
//! | [`post_json`](WebcastHttpClient::post_json) | `webcast/<path>` | JSON |
//! | [`get_livestream_page`](WebcastHttpClient::get_livestream_page) | `@<user>/live/` | HTML |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;

use crate::config::ConnectionSettings;
use crate::error::Result;
use crate::protocol::{WebcastResponse, decode_schema};
use crate::signing::UrlSigner;

use super::params::RequestParameters;
use super::request::{HttpContent, HttpRequest, RequestContext};

// ============================================================================
// WebcastHttpClient
// ============================================================================

/// HTTP client for the webcast API.
#[derive(Debug, Clone)]
pub struct WebcastHttpClient {
    webcast_api_url: String,
    web_url: String,
    language: String,
    context: RequestContext,
    signer: UrlSigner,
}

impl WebcastHttpClient {
    /// Creates a client from settings, a request context and a signer.
    #[must_use]
    pub fn new(settings: &ConnectionSettings, context: RequestContext, signer: UrlSigner) -> Self {
        Self {
            webcast_api_url: settings.webcast_api_url.clone(),
            web_url: settings.web_url.clone(),
            language: settings.client_language.clone(),
            context,
            signer,
        }
    }

    /// Returns the request context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Returns the URL signer.
    #[inline]
    #[must_use]
    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Returns the default client parameters with the configured language.
    #[must_use]
    pub fn client_params(&self) -> RequestParameters {
        RequestParameters::client_defaults()
            .with("app_language", self.language.clone())
            .with("browser_language", self.language.clone())
    }

    /// Resolves a path against the webcast API base.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        join(&self.webcast_api_url, path)
    }

    // ------------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------------

    /// Fetches `webcast/<path>` and decodes a protobuf `WebcastResponse`.
    ///
    /// # Errors
    ///
    /// - [`Error::SigningFailure`](crate::Error::SigningFailure) if `sign` is set and signing fails
    /// - [`Error::UnexpectedStatus`](crate::Error::UnexpectedStatus) on a non-2xx status
    /// - [`Error::DecodeFailure`](crate::Error::DecodeFailure) if the body is not a valid response
    pub async fn get_deserialized_message(
        &self,
        path: &str,
        params: Option<&RequestParameters>,
        sign: bool,
    ) -> Result<WebcastResponse> {
        let content = self
            .request(&self.api_url(path), params, sign)
            .await?
            .get()
            .await?
            .error_for_status()?;

        decode_schema(content.bytes())
    }

    /// Fetches `webcast/<path>` and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`get_deserialized_message`](Self::get_deserialized_message),
    /// with [`Error::Json`](crate::Error::Json) for an invalid body.
    pub async fn get_json(
        &self,
        path: &str,
        params: Option<&RequestParameters>,
        sign: bool,
    ) -> Result<Value> {
        self.request(&self.api_url(path), params, sign)
            .await?
            .get()
            .await?
            .error_for_status()?
            .json()
    }

    /// Posts a compact JSON body to `webcast/<path>` and parses the JSON reply.
    ///
    /// # Errors
    ///
    /// Same as [`get_json`](Self::get_json).
    pub async fn post_json(
        &self,
        path: &str,
        params: Option<&RequestParameters>,
        json: &Value,
        sign: bool,
    ) -> Result<Value> {
        let body = serde_json::to_string(json)?;
        self.request(&self.api_url(path), params, sign)
            .await?
            .post(body)
            .await?
            .error_for_status()?
            .json()
    }

    /// Fetches the public live page of `unique_id` as HTML.
    ///
    /// A leading `@` on the id is accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`](crate::Error::Http) on network failure
    /// - [`Error::UnexpectedStatus`](crate::Error::UnexpectedStatus) on a non-2xx status
    pub async fn get_livestream_page(&self, unique_id: &str, sign: bool) -> Result<HttpContent> {
        let user = unique_id.trim_start_matches('@');
        let url = join(&self.web_url, &format!("@{user}/live/"));

        self.request(&url, None, sign)
            .await?
            .get()
            .await?
            .error_for_status()
    }

    // ------------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------------

    async fn request(
        &self,
        url: &str,
        params: Option<&RequestParameters>,
        sign: bool,
    ) -> Result<HttpRequest> {
        let params = self.client_params().merged(params);

        if sign {
            let signed = self.signer.sign(url, Some(&params)).await?;
            debug!(url, "Routing request through signed URL");
            return Ok(HttpRequest::new(signed.signed_url, self.context.clone()));
        }

        Ok(HttpRequest::new(url, self.context.clone()).with_params(Some(params)))
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ============================================================================
// Tests
// ============================================================================
