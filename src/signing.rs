//! URL signing through the external signing service.
//!
//! The push transport only accepts URLs authorized by the signing service.
//! Signing also rotates the client identity: the service returns the
//! `User-Agent` the signature was computed for, and every later request
//! (including the transport handshake) must present it.
//!
//! # Exchange
//!
//! ```text
//! GET <sign_api_url>?client=ttlive-rust&uuc=<seq>&url=<urlencoded target?params>
//!
//! 200 OK
//! { "signedUrl": "wss://...", "User-Agent": "Mozilla/5.0 ..." }
//! ```

// ============================================================================
// Imports
// ============================================================================

use reqwest::header::HeaderValue;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::constants::SIGN_CLIENT_ID;
use crate::error::{Error, Result};
use crate::identifiers::ClientSeq;
use crate::net::{HttpRequest, RequestContext, RequestParameters};

// ============================================================================
// Types
// ============================================================================

/// Result of a successful signing exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Authorized URL.
    pub signed_url: String,
    /// Client identity the signature is bound to.
    pub user_agent: String,
}

/// Raw signing service response.
///
/// Both fields are optional here so that a missing field surfaces as a
/// [`Error::SigningFailure`] naming the field rather than a JSON error.
#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedUrl")]
    signed_url: Option<String>,
    #[serde(rename = "User-Agent")]
    user_agent: Option<String>,
}

// ============================================================================
// UrlSigner
// ============================================================================

/// Client of the URL-signing service.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    endpoint: String,
    seq: ClientSeq,
    context: RequestContext,
}

impl UrlSigner {
    /// Creates a signer for one client.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Signing service URL
    /// * `seq` - The client's sequence number, sent as `uuc`
    /// * `context` - Headers, cookies, proxies and timeout for the request
    #[must_use]
    pub fn new(endpoint: impl Into<String>, seq: ClientSeq, context: RequestContext) -> Self {
        Self {
            endpoint: endpoint.into(),
            seq,
            context,
        }
    }

    /// Returns the client's sequence number.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> ClientSeq {
        self.seq
    }

    /// Signs `url` with its query parameters.
    ///
    /// On success the shared default `User-Agent` is replaced with the one
    /// returned by the service. On failure the headers are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SigningFailure`] if the service is unreachable,
    /// answers with a non-2xx status, returns something other than JSON, or
    /// omits `signedUrl` or `User-Agent`.
    pub async fn sign(&self, url: &str, params: Option<&RequestParameters>) -> Result<SignedUrl> {
        let target = match params {
            Some(params) => params.append_to(url),
            None => url.to_string(),
        };

        let query = RequestParameters::new()
            .with("client", SIGN_CLIENT_ID)
            .with("uuc", self.seq.get())
            .with("url", target);

        debug!(client = %self.seq, url, "Requesting signed URL");

        let content = HttpRequest::new(self.endpoint.as_str(), self.context.clone())
            .with_params(Some(query))
            .get()
            .await
            .map_err(|e| {
                warn!(client = %self.seq, error = %e, "Signing service unreachable");
                Error::signing_failure_with("signing service request failed", e)
            })?
            .error_for_status()
            .map_err(|e| Error::signing_failure_with("signing service rejected request", e))?;

        let signed = Self::parse(content.bytes())?;

        self.context.headers.set_user_agent(signed.user_agent.clone());

        info!(client = %self.seq, "URL signed");

        Ok(signed)
    }

    /// Validates a signing response body.
    fn parse(body: &[u8]) -> Result<SignedUrl> {
        let response: SignResponse = serde_json::from_slice(body).map_err(|e| {
            Error::signing_failure_with(
                "insufficient values supplied for signing: response is not JSON",
                e,
            )
        })?;

        let signed_url = response
            .signed_url
            .ok_or_else(|| Error::signing_failure("insufficient values supplied for signing: missing signedUrl"))?;

        let user_agent = response
            .user_agent
            .ok_or_else(|| Error::signing_failure("insufficient values supplied for signing: missing User-Agent"))?;

        HeaderValue::from_str(&user_agent).map_err(|e| {
            Error::signing_failure_with("signing service returned an unusable User-Agent", e)
        })?;

        Ok(SignedUrl {
            signed_url,
            user_agent,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
