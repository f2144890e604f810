//! Portal sockets driven end to end with a real WebSocket client.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::TestApp;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: SocketAddr, code: &str) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{}/api/v1/ws/events/{}", addr, code))
        .await
        .unwrap();
    ws
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Skips data frames until the server closes; returns the close code.
async fn close_code(ws: &mut WsStream) -> u16 {
    loop {
        match timeout(TIMEOUT, ws.next()).await.expect("timed out waiting for close") {
            Some(Ok(Message::Close(Some(frame)))) => return u16::from(frame.code),
            Some(Ok(_)) => continue,
            other => panic!("expected a close frame, got {:?}", other),
        }
    }
}

async fn wait_for_count(app: &TestApp, code: &str, expected: usize) {
    timeout(TIMEOUT, async {
        while app.state.broadcaster.count_for(code) != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

#[tokio::test]
async fn test_connect_is_acknowledged_and_counted() {
    let app = TestApp::new().await;
    let event = app.create_event("Garden Wedding").await;
    let code = event["public_code"].as_str().unwrap();
    let addr = app.serve().await;

    let mut first = connect(addr, code).await;
    let ack = next_json(&mut first).await;
    assert_eq!(ack["type"], "connection");
    assert_eq!(ack["message"], "Connected to event: Garden Wedding");
    assert_eq!(ack["event_code"], code);
    assert_eq!(ack["connection_count"], 1);
    assert!(ack["timestamp"].is_string());

    let mut second = connect(addr, code).await;
    assert_eq!(next_json(&mut second).await["connection_count"], 2);
    assert_eq!(app.state.broadcaster.count_for(code), 2);
}

#[tokio::test]
async fn test_unknown_event_closes_with_4004() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    let mut ws = connect(addr, "NO_SUCH_CODE").await;
    assert_eq!(close_code(&mut ws).await, 4004);
    assert_eq!(app.state.broadcaster.count_for("NO_SUCH_CODE"), 0);
}

#[tokio::test]
async fn test_ping_is_answered_on_that_connection_only() {
    let app = TestApp::new().await;
    let event = app.create_event("Wedding").await;
    let code = event["public_code"].as_str().unwrap();
    let addr = app.serve().await;

    let mut pinger = connect(addr, code).await;
    next_json(&mut pinger).await;
    let mut bystander = connect(addr, code).await;
    next_json(&mut bystander).await;

    // Garbage and unknown kinds are ignored without dropping the connection.
    pinger.send(Message::text("not json")).await.unwrap();
    pinger.send(Message::text(json!({"type": "hello"}).to_string())).await.unwrap();
    pinger.send(Message::text(json!({"type": "ping", "timestamp": 42}).to_string())).await.unwrap();

    let pong = next_json(&mut pinger).await;
    assert_eq!(pong, json!({"type": "pong", "timestamp": 42}));

    assert!(timeout(Duration::from_millis(200), bystander.next()).await.is_err());
}

#[tokio::test]
async fn test_check_in_reaches_open_socket() {
    let app = TestApp::new().await;
    let event = app.seeded_event(&[("Jane Smith", "A1", 1.0, "none")]).await;
    let code = event["public_code"].as_str().unwrap();
    let addr = app.serve().await;

    let mut ws = connect(addr, code).await;
    next_json(&mut ws).await;

    app.public_json("/api/v1/guest/checkin", json!({"public_code": code, "name": "jane"})).await;

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "checkin");
    assert_eq!(msg["guest"]["name"], "Jane Smith");
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let app = TestApp::new().await;
    let event = app.create_event("Wedding").await;
    let code = event["public_code"].as_str().unwrap();
    let addr = app.serve().await;

    let mut ws = connect(addr, code).await;
    next_json(&mut ws).await;
    assert_eq!(app.state.broadcaster.count_for(code), 1);

    ws.close(None).await.unwrap();
    wait_for_count(&app, code, 0).await;
}

#[tokio::test]
async fn test_lagging_socket_is_closed_when_pruned() {
    let app = TestApp::new().await;
    let event = app.create_event("Wedding").await;
    let code = event["public_code"].as_str().unwrap();
    let addr = app.serve().await;

    let mut ws = connect(addr, code).await;
    next_json(&mut ws).await;
    assert_eq!(app.state.broadcaster.count_for(code), 1);

    // No await in between, so the socket writer cannot drain its queue.
    for _ in 0..100 {
        app.state.broadcaster.broadcast(code, &json!({"type": "guest_updated"}));
    }
    assert_eq!(app.state.broadcaster.count_for(code), 0);

    assert_eq!(close_code(&mut ws).await, 1013);
    assert_eq!(app.state.broadcaster.count_for(code), 0);
}
