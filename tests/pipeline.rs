//! End-to-end pipeline: sign, connect, receive, decode, acknowledge.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, ORIGIN, SEC_WEBSOCKET_PROTOCOL, USER_AGENT};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, data_frame, drain, mount_signer, push_server, settings};
use webcast_live::protocol::{FRAME_TYPE_ACK, WebcastMessage, WebcastPushFrame, WebsocketParam};
use webcast_live::{ConnectionEvent, Error, LiveConnection, WebcastResponse};

// ============================================================================
// Helpers
// ============================================================================

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn next(connection: &mut LiveConnection) -> Option<ConnectionEvent> {
    timeout(EVENT_TIMEOUT, connection.next_event())
        .await
        .expect("no event within timeout")
}

fn chat(count: usize) -> WebcastResponse {
    WebcastResponse {
        messages: (0..count)
            .map(|i| WebcastMessage {
                r#type: "WebcastChatMessage".into(),
                binary: vec![i as u8],
            })
            .collect(),
        ..Default::default()
    }
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_signed_identity_flows_into_handshake_and_later_requests() -> anyhow::Result<()> {
    common::init_logging();

    let http = MockServer::start().await;
    let (ws_url, seen) = push_server(drain).await;

    Mock::given(method("GET"))
        .and(path("/sign"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ttwid=abc; Path=/")
                .set_body_json(serde_json::json!({"signedUrl": ws_url, "User-Agent": "UA1"})),
        )
        .expect(1)
        .mount(&http)
        .await;

    Mock::given(method("GET"))
        .and(path("/webcast/room/info/"))
        .and(header("user-agent", "UA1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&http)
        .await;

    let client = client(settings(&http));
    client.store().set_cookie("sessionid", "s");

    let params = client.http().client_params().with("room_id", "42");
    let connection = client.connect("https://push.example/ws", Some(&params)).await?;

    assert!(connection.is_connected());
    assert!(client.is_connected());
    assert_eq!(client.headers().user_agent(), "UA1");

    let headers = seen.await?;
    assert_eq!(headers.get(USER_AGENT).unwrap(), "UA1");
    assert_eq!(headers.get(SEC_WEBSOCKET_PROTOCOL).unwrap(), "echo-protocol");
    assert_eq!(headers.get(ORIGIN).unwrap(), "https://www.tiktok.com");
    let cookie = headers.get(COOKIE).unwrap().to_str()?;
    assert!(cookie.contains("sessionid=s"));
    assert!(cookie.contains("ttwid=abc"));

    let info = client.http().get_json("room/info/", None, false).await?;
    assert_eq!(info["ok"], true);

    connection.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_signing_failure_prevents_connect() {
    let http = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"signedUrl": "ws://x"})))
        .mount(&http)
        .await;

    let client = client(settings(&http));
    let before = client.headers().user_agent();

    let err = client.connect("https://push.example/ws", None).await.unwrap_err();

    assert!(matches!(err, Error::SigningFailure { .. }));
    assert!(err.is_connection_fatal());
    assert!(!client.is_connected());
    assert_eq!(client.headers().user_agent(), before);
}

#[tokio::test]
async fn test_connect_failure_leaves_client_reconnectable() {
    let http = MockServer::start().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("ws://{}/", listener.local_addr().unwrap());
    drop(listener);
    mount_signer(&http, &dead, "UA1").await;

    let client = client(settings(&http));
    let err = client.connect("https://push.example/ws", None).await.unwrap_err();

    assert!(matches!(err, Error::ConnectFailure { .. }));
    assert!(!client.is_connected());
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_decode_failure_is_reported_and_stream_continues() {
    common::init_logging();

    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(|mut ws| async move {
        ws.send(Message::Binary(Bytes::from_static(&[0xff, 0xff, 0xff, 0xff])))
            .await
            .unwrap();
        ws.send(Message::Binary(data_frame(1, &chat(2)).into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        drain(ws).await;
    })
    .await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let mut connection = client.connect("https://push.example/ws", None).await.unwrap();

    assert!(matches!(next(&mut connection).await, Some(ConnectionEvent::FrameError(Error::DecodeFailure { .. }))));

    match next(&mut connection).await {
        Some(ConnectionEvent::Message(message)) => assert_eq!(message.response.messages.len(), 2),
        other => panic!("expected message, got {other:?}"),
    }

    assert!(matches!(next(&mut connection).await, Some(ConnectionEvent::Closed)));
    assert!(next(&mut connection).await.is_none());
}

#[tokio::test]
async fn test_non_data_frames_are_skipped() {
    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(|mut ws| async move {
        ws.send(Message::Text("hello".into())).await.unwrap();
        let heartbeat = WebcastPushFrame {
            id: 1,
            r#type: "hb".into(),
            binary: vec![],
        };
        ws.send(Message::Binary(heartbeat.encode_to_vec().into())).await.unwrap();
        ws.send(Message::Binary(data_frame(2, &chat(1)).into())).await.unwrap();
        drain(ws).await;
    })
    .await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let mut connection = client.connect("https://push.example/ws", None).await.unwrap();

    match next(&mut connection).await {
        Some(ConnectionEvent::Message(message)) => assert_eq!(message.id.get(), 2),
        other => panic!("expected message, got {other:?}"),
    }

    connection.disconnect().await.unwrap();
    assert!(matches!(next(&mut connection).await, Some(ConnectionEvent::Closed)));
}

#[tokio::test]
async fn test_need_ack_sends_ack_before_delivery() {
    let http = MockServer::start().await;
    let (ack_tx, ack_rx) = oneshot::channel();
    let (ws_url, _seen) = push_server(|mut ws| async move {
        let response = WebcastResponse {
            need_ack: true,
            internal_ext: "ext-1".into(),
            ..chat(1)
        };
        ws.send(Message::Binary(data_frame(5, &response).into())).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            if let Message::Binary(data) = message {
                let _ = ack_tx.send(WebcastPushFrame::decode(data.as_ref()).unwrap());
                break;
            }
        }
        drain(ws).await;
    })
    .await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let mut connection = client.connect("https://push.example/ws", None).await.unwrap();

    assert!(matches!(next(&mut connection).await, Some(ConnectionEvent::Message(_))));

    let ack = timeout(EVENT_TIMEOUT, ack_rx).await.unwrap().unwrap();
    assert_eq!(ack.r#type, FRAME_TYPE_ACK);
    assert_eq!(ack.id, 5);
    assert_eq!(ack.binary, b"ext-1");
}

#[tokio::test]
async fn test_oversized_frame_fails_connection() {
    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(|mut ws| async move {
        ws.send(Message::Binary(Bytes::from(vec![0u8; 20_000]))).await.unwrap();
        drain(ws).await;
    })
    .await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let mut connection = client.connect("https://push.example/ws", None).await.unwrap();

    match next(&mut connection).await {
        Some(ConnectionEvent::Failed(err)) => {
            assert!(matches!(err, Error::FrameTooLarge { limit: 10_000, .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(next(&mut connection).await.is_none());
    assert!(!connection.is_connected());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_second_connect_is_already_connected() {
    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(drain).await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let connection = client.connect("https://push.example/ws", None).await.unwrap();

    assert!(matches!(
        client.connect("https://push.example/ws", None).await,
        Err(Error::AlreadyConnected)
    ));

    client.disconnect().await.unwrap();
    client.disconnect().await.unwrap();
    assert!(!connection.is_connected());
}

#[tokio::test]
async fn test_handle_disconnect_ends_stream_with_closed() {
    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(drain).await;
    mount_signer(&http, &ws_url, "UA1").await;

    let client = client(settings(&http));
    let mut connection = client.connect("https://push.example/ws", None).await.unwrap();

    let handle = connection.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.disconnect().await.unwrap();
    });

    assert!(matches!(next(&mut connection).await, Some(ConnectionEvent::Closed)));
    assert!(next(&mut connection).await.is_none());
}

// ============================================================================
// Room
// ============================================================================

#[tokio::test]
async fn test_connect_room_delivers_existing_messages_first() {
    common::init_logging();

    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(|mut ws| async move {
        ws.send(Message::Binary(data_frame(9, &chat(3)).into())).await.unwrap();
        drain(ws).await;
    })
    .await;

    // Room fetch signing points back at the mock
    let fetch_url = format!("{}/signed/fetch", http.uri());
    Mock::given(method("GET"))
        .and(path("/sign"))
        .and(|request: &wiremock::Request| {
            request
                .url
                .query_pairs()
                .any(|(k, v)| k == "url" && v.contains("/webcast/im/fetch/") && v.contains("room_id=42"))
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"signedUrl": fetch_url, "User-Agent": "UA1"})),
        )
        .expect(1)
        .mount(&http)
        .await;

    // Push channel signing must carry the fetched routing state
    Mock::given(method("GET"))
        .and(path("/sign"))
        .and(|request: &wiremock::Request| {
            request.url.query_pairs().any(|(k, v)| {
                k == "url"
                    && v.starts_with("wss://push.example/ws?")
                    && v.contains("cursor=cur-1")
                    && v.contains("internal_ext=ext-1")
                    && v.contains("imprp=token")
            })
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"signedUrl": ws_url, "User-Agent": "UA2"})),
        )
        .expect(1)
        .mount(&http)
        .await;

    let room = WebcastResponse {
        cursor: "cur-1".into(),
        internal_ext: "ext-1".into(),
        push_server: "wss://push.example/ws".into(),
        ws_param: vec![WebsocketParam {
            name: "imprp".into(),
            value: "token".into(),
        }],
        ..chat(1)
    };
    Mock::given(method("GET"))
        .and(path("/signed/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(room.encode_to_vec()))
        .expect(1)
        .mount(&http)
        .await;

    let client = client(settings(&http));
    let mut connection = client.connect_room("42").await.unwrap();
    assert_eq!(client.headers().user_agent(), "UA2");

    match next(&mut connection).await {
        Some(ConnectionEvent::Message(message)) => {
            assert_eq!(message.response.cursor, "cur-1");
            assert_eq!(message.response.messages.len(), 1);
        }
        other => panic!("expected existing messages, got {other:?}"),
    }

    match next(&mut connection).await {
        Some(ConnectionEvent::Message(message)) => {
            assert_eq!(message.id.get(), 9);
            assert_eq!(message.response.messages.len(), 3);
        }
        other => panic!("expected pushed message, got {other:?}"),
    }

    connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_connect_room_without_push_server_is_protocol_error() {
    let http = MockServer::start().await;
    let fetch_url = format!("{}/signed/fetch", http.uri());
    mount_signer(&http, &fetch_url, "UA1").await;

    Mock::given(method("GET"))
        .and(path("/signed/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(chat(1).encode_to_vec()))
        .mount(&http)
        .await;

    let client = client(settings(&http));
    let err = client.connect_room("42").await.unwrap_err();

    assert!(matches!(err, Error::Protocol { .. }));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_connect_room_skips_existing_messages_when_disabled() {
    let http = MockServer::start().await;
    let (ws_url, _seen) = push_server(|mut ws| async move {
        ws.send(Message::Binary(data_frame(4, &chat(1)).into())).await.unwrap();
        drain(ws).await;
    })
    .await;

    let fetch_url = format!("{}/signed/fetch", http.uri());
    Mock::given(method("GET"))
        .and(path("/sign"))
        .and(|request: &wiremock::Request| {
            request
                .url
                .query_pairs()
                .any(|(k, v)| k == "url" && v.contains("/im/fetch/"))
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"signedUrl": fetch_url, "User-Agent": "UA1"})),
        )
        .mount(&http)
        .await;
    Mock::given(method("GET"))
        .and(path("/sign"))
        .and(|request: &wiremock::Request| {
            request
                .url
                .query_pairs()
                .any(|(k, v)| k == "url" && v.starts_with("wss://"))
        })
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"signedUrl": ws_url, "User-Agent": "UA1"})),
        )
        .mount(&http)
        .await;

    let room = WebcastResponse {
        push_server: "wss://push.example/ws".into(),
        ..chat(5)
    };
    Mock::given(method("GET"))
        .and(path("/signed/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(room.encode_to_vec()))
        .mount(&http)
        .await;

    let mut settings = settings(&http);
    settings.handle_existing_messages_on_connect = false;
    let client = client(settings);
    let mut connection = client.connect_room("42").await.unwrap();

    match next(&mut connection).await {
        Some(ConnectionEvent::Message(message)) => assert_eq!(message.id.get(), 4),
        other => panic!("expected pushed message, got {other:?}"),
    }

    connection.disconnect().await.unwrap();
}
