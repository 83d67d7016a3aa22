// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real sockets against a served router.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parlor_core::Identity;
use parlor_gateway::{GateConfig, GatewayState, router};
use parlor_test_utils::TestHarness;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(h: &TestHarness) -> SocketAddr {
    let state = GatewayState::new(h.service.clone(), h.resolver.clone(), GateConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, cookie: Option<String>) -> Result<Client, WsError> {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert("cookie", cookie.parse().unwrap());
    }
    connect_async(request).await.map(|(stream, _)| stream)
}

async fn login(h: &TestHarness, identity: &Identity) -> String {
    let token = h
        .session_token(&identity.id, chrono::Duration::hours(1))
        .await
        .unwrap();
    format!("parlor.sid={token}")
}

async fn send(client: &mut Client, frame: Value) {
    client.send(Message::text(frame.to_string())).await.unwrap();
}

/// Next frame of the given type, skipping others.
async fn expect(client: &mut Client, kind: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("frame in time")
            .expect("socket open")
            .unwrap();
        if let Message::Text(text) = msg {
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            if frame["type"] == kind {
                return frame;
            }
        }
    }
}

/// Round-trip one request so the server-side session is known to be open.
async fn ready(client: &mut Client) {
    send(client, json!({"type": "join_room", "request_id": "ready", "room_id": "no-such-room"})).await;
    assert_eq!(expect(client, "error").await["error"]["code"], "not_found");
}

#[tokio::test]
async fn upgrade_without_session_is_refused() {
    let h = TestHarness::new().await.unwrap();
    let addr = serve(&h).await;
    match connect(addr, None).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(other) => panic!("expected HTTP 401, got {other}"),
        Ok(_) => panic!("unauthenticated upgrade was accepted"),
    }
}

#[tokio::test]
async fn direct_room_conversation_over_sockets() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let u2 = h.identity("u2", "Ben", None).await.unwrap();
    let u3 = h.identity("u3", "Cy", None).await.unwrap();
    let addr = serve(&h).await;

    let mut ana = connect(addr, Some(login(&h, &u1).await)).await.unwrap();
    let mut ben = connect(addr, Some(login(&h, &u2).await)).await.unwrap();

    ready(&mut ana).await;
    ready(&mut ben).await;

    send(&mut ana, json!({"type": "create_direct_room", "request_id": "d1", "member_id": "u2"})).await;
    let created = expect(&mut ana, "direct_room").await;
    assert_eq!(created["request_id"], "d1");
    let room_id = created["room"]["id"].as_str().unwrap().to_string();
    let pushed = expect(&mut ben, "direct_room_created").await;
    assert_eq!(pushed["room"]["id"], room_id.as_str());
    assert_eq!(pushed["room"]["name"], "Ana");

    for client in [&mut ana, &mut ben] {
        send(client, json!({"type": "join_room", "request_id": "j", "room_id": room_id})).await;
        let joined = expect(client, "joined_room").await;
        assert_eq!(joined["history"].as_array().unwrap().len(), 0);
    }

    send(&mut ana, json!({"type": "send_message", "room_id": room_id, "body": "hi"})).await;
    assert_eq!(expect(&mut ben, "message_received").await["message"]["body"], "hi");
    assert_eq!(expect(&mut ana, "message_received").await["message"]["body"], "hi");
    send(&mut ben, json!({"type": "send_message", "room_id": room_id, "body": "hello"})).await;
    assert_eq!(expect(&mut ana, "message_received").await["message"]["body"], "hello");

    send(&mut ana, json!({"type": "join_room", "request_id": "j2", "room_id": room_id})).await;
    let history = expect(&mut ana, "joined_room").await;
    let bodies: Vec<&str> = history["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["hi", "hello"]);

    let mut cy = connect(addr, Some(login(&h, &u3).await)).await.unwrap();
    send(&mut cy, json!({"type": "join_room", "request_id": "x", "room_id": room_id})).await;
    let denied = expect(&mut cy, "error").await;
    assert_eq!(denied["request_id"], "x");
    assert_eq!(denied["error"]["code"], "not_authorized");
}

#[tokio::test]
async fn malformed_frames_keep_the_connection_open() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let addr = serve(&h).await;
    let mut ana = connect(addr, Some(login(&h, &u1).await)).await.unwrap();

    client_sends_text(&mut ana, "not json").await;
    assert_eq!(expect(&mut ana, "error").await["error"]["code"], "validation_failed");

    send(&mut ana, json!({"type": "join_room", "request_id": "j", "room_id": room.id})).await;
    expect(&mut ana, "joined_room").await;
}

async fn client_sends_text(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.unwrap();
}
