//! Single outbound HTTP request.
//!
//! [`HttpRequest`] applies the default headers, the accumulated cookies, the
//! next proxy from the pool and the configured timeout, then performs one GET
//! or POST. It never retries.
//!
//! The underlying [`reqwest::Client`] is built once per proxy and shared by
//! every clone of a [`RequestContext`], so connections are pooled. Headers and
//! timeout are applied per request, which keeps a freshly signed `User-Agent`
//! visible to the next call.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Client, Method};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::store::{CredentialStore, ProxyConfig};

use super::headers::DefaultHeaders;
use super::params::RequestParameters;

// ============================================================================
// RequestContext
// ============================================================================

/// Shared material every request of one client draws from.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Default header set.
    pub headers: DefaultHeaders,
    /// Cookies and proxies.
    pub store: Arc<CredentialStore>,
    /// Per-request timeout.
    pub timeout: Duration,
    clients: Arc<ClientCache>,
}

impl RequestContext {
    /// Creates a request context.
    #[must_use]
    pub fn new(headers: DefaultHeaders, store: Arc<CredentialStore>, timeout: Duration) -> Self {
        Self {
            headers,
            store,
            timeout,
            clients: Arc::new(ClientCache::default()),
        }
    }

    /// Returns the pooled client for `proxy`, building it on first use.
    fn client(&self, proxy: Option<&ProxyConfig>) -> Result<Client> {
        self.clients.get_or_build(proxy)
    }
}

// ============================================================================
// ClientCache
// ============================================================================

/// One pooled [`Client`] per proxy, plus one for direct connections.
#[derive(Debug, Default)]
struct ClientCache {
    clients: Mutex<FxHashMap<Option<ProxyConfig>, Client>>,
}

impl ClientCache {
    fn get_or_build(&self, proxy: Option<&ProxyConfig>) -> Result<Client> {
        let key = proxy.cloned();
        let mut clients = self.clients.lock();

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        let client = builder.build()?;

        debug!(proxy = ?proxy.map(ProxyConfig::url), "HTTP client built");

        clients.insert(key, client.clone());
        Ok(client)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.clients.lock().len()
    }
}

// ============================================================================
// HttpContent
// ============================================================================

/// Response of one HTTP request.
#[derive(Debug, Clone)]
pub struct HttpContent {
    url: String,
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpContent {
    /// Returns the HTTP status code.
    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for a 2xx status.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the response headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Fails on a non-2xx status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedStatus`] for a non-2xx status.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::UnexpectedStatus {
                status: self.status,
                url: self.url,
            })
        }
    }
}

// ============================================================================
// HttpRequest
// ============================================================================

/// One outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    url: String,
    params: Option<RequestParameters>,
    context: RequestContext,
}

impl HttpRequest {
    /// Creates a request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, context: RequestContext) -> Self {
        Self {
            url: url.into(),
            params: None,
            context,
        }
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_params(mut self, params: Option<RequestParameters>) -> Self {
        self.params = params;
        self
    }

    /// Returns the request URL without query parameters.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a GET.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on network or timeout failure
    /// - [`Error::Config`] if the default headers or proxy are invalid
    pub async fn get(&self) -> Result<HttpContent> {
        self.execute(Method::GET, None).await
    }

    /// Performs a POST with a UTF-8 body.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on network or timeout failure
    /// - [`Error::Config`] if the default headers or proxy are invalid
    pub async fn post(&self, body: impl Into<String>) -> Result<HttpContent> {
        self.execute(Method::POST, Some(body.into())).await
    }

    async fn execute(&self, method: Method, body: Option<String>) -> Result<HttpContent> {
        let proxy = self.context.store.next_proxy();
        let client = self.context.client(proxy.as_ref())?;

        let mut builder = client
            .request(method.clone(), self.url.as_str())
            .headers(self.context.headers.to_header_map()?)
            .timeout(self.context.timeout);
        if let Some(params) = &self.params {
            builder = builder.query(&params.to_pairs());
        }
        if let Some(cookie) = self.context.store.cookie_header() {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| Error::config(format!("Invalid cookie header: {e}")))?;
            builder = builder.header(COOKIE, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        trace!(%method, url = %self.url, proxy = ?proxy.as_ref().map(ProxyConfig::url), "Sending request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if let Some(proxy) = &proxy
                    && (e.is_connect() || e.is_timeout())
                {
                    warn!(proxy = %proxy.url(), error = %e, "Request through proxy failed");
                    self.context.store.mark_proxy_failed(proxy);
                }
                return Err(e.into());
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        self.context.store.absorb_set_cookies(
            headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );

        let body = response.bytes().await?;

        debug!(%method, url = %self.url, status, len = body.len(), "Response received");

        Ok(HttpContent {
            url: self.url.clone(),
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::store::ProxySettings;

    fn context() -> RequestContext {
        RequestContext::new(
            DefaultHeaders::new(),
            Arc::new(CredentialStore::new(None)),
            Duration::from_secs(5),
        )
    }

    fn proxied_context(proxies: Vec<ProxyConfig>) -> RequestContext {
        RequestContext::new(
            DefaultHeaders::new(),
            Arc::new(CredentialStore::new(Some(&ProxySettings::new(proxies)))),
            Duration::from_secs(5),
        )
    }

    /// A loopback port nothing listens on.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_get_applies_params_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/room/info/"))
            .and(query_param("aid", "1988"))
            .and(header("accept-encoding", "gzip, deflate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let params = RequestParameters::new().with("aid", 1988_i64);
        let content = HttpRequest::new(format!("{}/webcast/room/info/", server.uri()), context())
            .with_params(Some(params))
            .get()
            .await
            .unwrap();

        assert_eq!(content.status(), 200);
        assert_eq!(content.text(), "ok");
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let content = HttpRequest::new(format!("{}/submit", server.uri()), context())
            .post(r#"{"a":1}"#)
            .await
            .unwrap();

        let value: serde_json::Value = content.json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_set_cookie_is_absorbed_and_replayed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "ttwid=abc; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .and(header("cookie", "ttwid=abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context();
        HttpRequest::new(format!("{}/first", server.uri()), ctx.clone())
            .get()
            .await
            .unwrap();
        HttpRequest::new(format!("{}/second", server.uri()), ctx.clone())
            .get()
            .await
            .unwrap();

        assert_eq!(ctx.store.cookie_header().as_deref(), Some("ttwid=abc"));
    }

    #[tokio::test]
    async fn test_error_for_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let content = HttpRequest::new(server.uri(), context()).get().await.unwrap();
        assert!(!content.is_success());
        assert!(matches!(
            content.error_for_status(),
            Err(Error::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        // Nothing listens on port 9 on loopback in test environments
        let result = HttpRequest::new("http://127.0.0.1:9/", context()).get().await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_client_is_reused_and_sees_new_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .and(header("user-agent", "UA2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context();
        HttpRequest::new(format!("{}/first", server.uri()), ctx.clone())
            .get()
            .await
            .unwrap();

        ctx.headers.set_user_agent("UA2");
        let content = HttpRequest::new(format!("{}/second", server.uri()), ctx.clone())
            .get()
            .await
            .unwrap();

        assert_eq!(content.status(), 200);
        assert_eq!(ctx.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_marked_failed() {
        let ctx = proxied_context(vec![ProxyConfig::http("127.0.0.1", closed_port())]);

        let result = HttpRequest::new("http://webcast.invalid/ping", ctx.clone())
            .get()
            .await;

        assert!(matches!(result, Err(Error::Http(_))));
        assert_eq!(ctx.store.proxy_pool().unwrap().alive_count(), 0);
    }

    #[tokio::test]
    async fn test_rotation_moves_past_failed_proxy() {
        // The mock server answers proxied requests for any target
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
            .expect(2)
            .mount(&server)
            .await;

        let dead = ProxyConfig::http("127.0.0.1", closed_port());
        let live = ProxyConfig::http("127.0.0.1", server.address().port());
        let ctx = proxied_context(vec![dead.clone(), live.clone()]);
        let request = HttpRequest::new("http://webcast.invalid/ping", ctx.clone());

        assert!(matches!(request.get().await, Err(Error::Http(_))));

        assert_eq!(request.get().await.unwrap().text(), "via proxy");
        assert_eq!(request.get().await.unwrap().text(), "via proxy");

        let entries = ctx.store.proxy_pool().unwrap().entries();
        assert_eq!(entries[0].config, dead);
        assert!(!entries[0].alive);
        assert_eq!(entries[1].config, live);
        assert!(entries[1].alive);
        assert_eq!(entries[1].uses, 2);
        assert_eq!(ctx.clients.len(), 2);
    }
}
