//! Shared fixtures for integration tests.
//!
//! - Loopback WebSocket push server that echoes the offered sub-protocol
//! - Signing service mock on `wiremock`
//! - Frame builders

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use prost::Message as _;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webcast_live::protocol::{FRAME_TYPE_MESSAGE, WebcastPushFrame, WebcastResponse};
use webcast_live::{ClientRegistry, ConnectionSettings, WebcastClient};

// ============================================================================
// Types
// ============================================================================

pub type ServerStream = WebSocketStream<TcpStream>;

/// Handshake headers seen by the push server.
pub type SeenHeaders = oneshot::Receiver<HeaderMap>;

// ============================================================================
// Logging
// ============================================================================

/// Initialize tracing once for the test binary.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Push Server
// ============================================================================

/// Starts a single-connection push server running `handler`.
pub async fn push_server<F, Fut>(handler: F) -> (String, SeenHeaders)
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (headers_tx, headers_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
            if let Some(protocol) = request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
                response
                    .headers_mut()
                    .insert(SEC_WEBSOCKET_PROTOCOL, protocol.clone());
            }
            let _ = headers_tx.send(request.headers().clone());
            Ok(response)
        };
        let ws = accept_hdr_async(stream, callback).await.unwrap();
        handler(ws).await;
    });

    (format!("ws://{addr}/webcast/im/push/"), headers_rx)
}

/// Reads until the client goes away.
pub async fn drain(mut ws: ServerStream) {
    while let Some(Ok(_)) = ws.next().await {}
}

// ============================================================================
// Signing Service
// ============================================================================

/// Mounts a signing endpoint answering every request with `signed_url`.
pub async fn mount_signer(server: &MockServer, signed_url: &str, user_agent: &str) {
    Mock::given(method("GET"))
        .and(path("/sign"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"signedUrl": signed_url, "User-Agent": user_agent})),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Client
// ============================================================================

/// Settings pointing every endpoint at `server`.
pub fn settings(server: &MockServer) -> ConnectionSettings {
    ConnectionSettings::builder()
        .timeout(Duration::from_secs(20))
        .socket_buffer_size(10_000)
        .sign_api_url(format!("{}/sign", server.uri()))
        .webcast_api_url(format!("{}/webcast/", server.uri()))
        .web_url(format!("{}/", server.uri()))
        .build()
        .unwrap()
}

/// Client on an isolated registry.
pub fn client(settings: ConnectionSettings) -> WebcastClient {
    WebcastClient::with_registry(settings, Arc::new(ClientRegistry::new())).unwrap()
}

// ============================================================================
// Frames
// ============================================================================

/// Encodes a data frame carrying `response`.
pub fn data_frame(id: u64, response: &WebcastResponse) -> Vec<u8> {
    WebcastPushFrame {
        id,
        r#type: FRAME_TYPE_MESSAGE.to_string(),
        binary: response.encode_to_vec(),
    }
    .encode_to_vec()
}
