//! Duplex channel over a real WebSocket connection.
//!
//! A local tokio-tungstenite server accepts one connection, checks the token
//! query, greets the client and echoes what it receives.

mod common;

use std::sync::Arc;

use common::*;
use futures_util::{SinkExt, StreamExt};
use portal_net::adapters::TungsteniteConnector;
use portal_net::config::ChannelConfig;
use portal_net::error::ChannelError;
use portal_net::websocket::{ChannelEvent, ChannelState, CloseReason, DuplexChannel};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Start a one-shot echo server; returns its ws:// base URL and the
/// request path it saw.
async fn echo_server() -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let callback = move |request: &Request, response: Response| {
            let _ = path_tx.send(request.uri().to_string());
            Ok::<_, ErrorResponse>(response)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
            .await
            .unwrap();

        ws.send(Message::Text(r#"{"type":"ready"}"#.to_string()))
            .await
            .unwrap();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => ws.send(Message::Text(text)).await.unwrap(),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    (format!("ws://{}/ws", addr), path_rx)
}

#[tokio::test]
async fn test_round_trip_over_tungstenite() {
    let (base_url, path_rx) = echo_server().await;
    let channel = DuplexChannel::new(
        test_store(),
        Arc::new(TungsteniteConnector::new()),
        ChannelConfig::new(base_url).with_max_attempts(1),
    );
    let mut handle = channel.connect("company-42");

    assert_eq!(
        handle.recv().await,
        Some(ChannelEvent::Message(json!({ "type": "ready" })))
    );
    assert_eq!(
        path_rx.await.unwrap(),
        format!("/ws/company-42?token={}", OLD_ACCESS)
    );
    wait_for_state(&handle, ChannelState::Open).await;

    handle
        .send(&json!({ "type": "question", "text": "Guidance for FY25?" }))
        .await
        .unwrap();
    assert_eq!(
        handle.recv().await,
        Some(ChannelEvent::Message(
            json!({ "type": "question", "text": "Guidance for FY25?" })
        ))
    );

    handle.close();
    assert_eq!(handle.closed().await, CloseReason::Requested);
}

#[tokio::test]
async fn test_unreachable_server_exhausts_budget() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = DuplexChannel::new(
        test_store(),
        Arc::new(TungsteniteConnector::new()),
        ChannelConfig::new(format!("ws://{}/ws", addr))
            .with_max_attempts(2)
            .with_reconnect_interval(std::time::Duration::from_millis(10)),
    );
    let mut handle = channel.connect("company-42");

    match handle.recv().await {
        Some(ChannelEvent::Exhausted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(last_error, ChannelError::ConnectionFailed(_)));
            assert!(last_error.category().is_retryable());
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(handle.state(), ChannelState::Closed(CloseReason::Exhausted));
}

#[tokio::test]
async fn test_server_ping_gets_exactly_one_pong() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (pongs_tx, pongs_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        ws.send(Message::Ping(b"hb".to_vec())).await.unwrap();

        let mut pongs = 0;
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Pong(data) => {
                    assert_eq!(data, b"hb".to_vec());
                    pongs += 1;
                }
                Message::Text(_) => break,
                _ => {}
            }
        }
        let _ = pongs_tx.send(pongs);
    });

    let channel = DuplexChannel::new(
        test_store(),
        Arc::new(TungsteniteConnector::new()),
        ChannelConfig::new(format!("ws://{}/ws", addr)).with_max_attempts(1),
    );
    let handle = channel.connect("company-42");
    wait_for_state(&handle, ChannelState::Open).await;
    // Give the transport time to read the ping and queue its reply
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    handle.send(&json!({ "type": "done" })).await.unwrap();
    assert_eq!(pongs_rx.await.unwrap(), 1);
}
