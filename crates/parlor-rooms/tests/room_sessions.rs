// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room session protocol over the in-process stack.

use std::time::Duration;

use parlor_core::{Message, MessageId, RoomId, RoomKind, RoomStore, UserId};
use parlor_rooms::{ClientFrame, RoomState, ServerFrame};
use parlor_test_utils::TestHarness;
use tokio::sync::mpsc;

fn join(room: &RoomId) -> ClientFrame {
    ClientFrame::JoinRoom {
        request_id: Some("join".to_string()),
        room_id: room.clone(),
    }
}

fn send(room: &RoomId, body: &str) -> ClientFrame {
    ClientFrame::SendMessage {
        request_id: None,
        room_id: room.clone(),
        body: body.to_string(),
    }
}

fn history_of(frame: Option<ServerFrame>) -> Vec<Message> {
    match frame {
        Some(ServerFrame::JoinedRoom { history, .. }) => history,
        other => panic!("expected joined_room, got {other:?}"),
    }
}

fn error_code(frame: Option<ServerFrame>) -> String {
    match frame {
        Some(ServerFrame::Error { error, .. }) => error.code,
        other => panic!("expected error, got {other:?}"),
    }
}

fn bodies(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.body.as_str()).collect()
}

/// Next pushed message, skipping presence frames.
async fn next_message(rx: &mut mpsc::Receiver<ServerFrame>) -> Message {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("frame in time")
            .expect("outbound open");
        if let ServerFrame::MessageReceived { message } = frame {
            return message;
        }
    }
}

#[tokio::test]
async fn direct_room_history_and_outsider() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let u2 = h.identity("u2", "Ben", None).await.unwrap();
    let u3 = h.identity("u3", "Cy", None).await.unwrap();
    let room = h.direct_room(&u1, &u2).await.unwrap();

    let (mut s1, _rx1) = h.connect(&u1);
    let (mut s2, _rx2) = h.connect(&u2);
    history_of(s1.handle(join(&room.id)).await);
    history_of(s2.handle(join(&room.id)).await);
    assert!(s1.handle(send(&room.id, "hi")).await.is_none());
    assert!(s2.handle(send(&room.id, "hello")).await.is_none());

    let (mut again, _rx) = h.connect(&u1);
    let history = history_of(again.handle(join(&room.id)).await);
    assert_eq!(bodies(&history), ["hi", "hello"]);
    assert_eq!(history[0].sender_id, u1.id);
    assert_eq!(history[1].sender_id, u2.id);
    assert!(history[0].id < history[1].id);

    let (mut outsider, _rx3) = h.connect(&u3);
    assert_eq!(error_code(outsider.handle(join(&room.id)).await), "not_authorized");
    assert_eq!(outsider.state(&room.id), RoomState::Unjoined);
}

#[tokio::test]
async fn sends_are_listed_in_creation_order() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);
    history_of(session.handle(join(&room.id)).await);

    let sent: Vec<String> = (1..=7).map(|i| format!("m{i}")).collect();
    for body in &sent {
        session.send(&room.id, body).await.unwrap();
    }
    let listed = h.store.list_recent(&room.id, 7).await.unwrap();
    assert_eq!(bodies(&listed), sent.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(h.bus.published_messages().await, 7);
}

#[tokio::test]
async fn blank_body_is_rejected_without_side_effects() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);
    history_of(session.handle(join(&room.id)).await);

    for body in ["", "   ", "\n\t"] {
        assert_eq!(
            error_code(session.handle(send(&room.id, body)).await),
            "validation_failed"
        );
    }
    assert!(h.store.list_recent(&room.id, 10).await.unwrap().is_empty());
    assert_eq!(h.bus.published_messages().await, 0);
}

#[tokio::test]
async fn sending_requires_joining_first() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);

    assert_eq!(error_code(session.handle(send(&room.id, "hi")).await), "not_authorized");
    let more = ClientFrame::LoadMoreMessages {
        request_id: None,
        room_id: room.id.clone(),
        before_message_id: MessageId(10),
    };
    assert_eq!(error_code(session.handle(more).await), "not_authorized");
}

#[tokio::test]
async fn unknown_room_is_not_found() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let (mut session, _rx) = h.connect(&u1);
    assert_eq!(
        error_code(session.handle(join(&RoomId::from("nope"))).await),
        "not_found"
    );
}

#[tokio::test]
async fn restricted_room_admits_members_only() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let u2 = h.identity("u2", "Ben", None).await.unwrap();
    let room = h.restricted_room("staff", &[&u1]).await.unwrap();

    let (mut member, _rx1) = h.connect(&u1);
    history_of(member.handle(join(&room.id)).await);
    let (mut stranger, _rx2) = h.connect(&u2);
    assert_eq!(error_code(stranger.handle(join(&room.id)).await), "not_authorized");
}

#[tokio::test]
async fn joining_an_open_room_records_membership() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    assert!(!room.is_member(&u1.id));

    let (mut session, _rx) = h.connect(&u1);
    history_of(session.handle(join(&room.id)).await);
    history_of(session.handle(join(&room.id)).await);

    let stored = h.store.get_room(&room.id).await.unwrap().unwrap();
    assert_eq!(stored.members, vec![u1.id.clone()]);
    assert_eq!(h.service.members(&u1.id, &room.id).await.unwrap(), vec![u1.id]);
}

#[tokio::test]
async fn rejoin_resends_history_without_second_subscription() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);

    history_of(session.handle(join(&room.id)).await);
    session.send(&room.id, "hi").await.unwrap();
    let history = history_of(session.handle(join(&room.id)).await);
    assert_eq!(bodies(&history), ["hi"]);
    assert_eq!(h.bus.hub().subscriber_count(&room.id), 1);
}

#[tokio::test]
async fn messages_fan_out_to_every_joined_connection() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let u2 = h.identity("u2", "Ben", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut s1, mut rx1) = h.connect(&u1);
    let (mut s2, mut rx2) = h.connect(&u2);
    history_of(s1.handle(join(&room.id)).await);
    history_of(s2.handle(join(&room.id)).await);

    let sent = s1.send(&room.id, "hello all").await.unwrap();
    assert_eq!(next_message(&mut rx1).await, sent);
    assert_eq!(next_message(&mut rx2).await, sent);
    assert_eq!(sent.sender_name.as_deref(), Some("Ana"));
}

#[tokio::test]
async fn pagination_covers_history_without_gaps() {
    let h = TestHarness::builder().with_history_limit(20).build().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    for i in 1..=45 {
        h.store
            .append_message(&room.id, &u1.id, &format!("m{i}"))
            .await
            .unwrap();
    }

    let (mut session, _rx) = h.connect(&u1);
    let mut seen = history_of(session.handle(join(&room.id)).await);
    assert_eq!(seen.len(), 20);

    // Walk back twice so the second pass is served by the backfilled cache.
    for pass in 0..2 {
        let mut collected = seen.clone();
        loop {
            let oldest = collected[0].id;
            let page = session.load_more(&room.id, oldest).await.unwrap();
            if page.is_empty() {
                break;
            }
            assert!(page.iter().all(|m| m.id < oldest), "pass {pass}");
            collected = page.into_iter().chain(collected).collect();
        }
        let ids: Vec<i64> = collected.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, (1..=45).collect::<Vec<_>>(), "pass {pass}");
        if pass == 0 {
            seen = history_of(session.handle(join(&room.id)).await);
        }
    }
}

#[tokio::test]
async fn leave_releases_the_room() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);
    history_of(session.handle(join(&room.id)).await);
    assert_eq!(session.state(&room.id), RoomState::Joined);

    let reply = session
        .handle(ClientFrame::LeaveRoom {
            request_id: Some("bye".to_string()),
            room_id: room.id.clone(),
        })
        .await;
    assert!(matches!(reply, Some(ServerFrame::LeftRoom { .. })));
    assert_eq!(session.state(&room.id), RoomState::Unjoined);
    assert_eq!(error_code(session.handle(send(&room.id, "hi")).await), "not_authorized");

    for _ in 0..100 {
        if h.bus.hub().topic_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(h.bus.hub().topic_count(), 0);
}

#[tokio::test]
async fn close_clears_presence_on_last_connection() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let (mut first, _rx1) = h.connect(&u1);
    let (mut second, _rx2) = h.connect(&u1);
    assert!(h.presence.is_online(&u1.id));

    first.close().await;
    assert!(h.presence.is_online(&u1.id));
    second.close().await;
    assert!(!h.presence.is_online(&u1.id));
    assert_eq!(second.state(&RoomId::from("any")), RoomState::Closed);
}

#[tokio::test]
async fn direct_room_creation_notifies_counterpart_once() {
    let h = TestHarness::new().await.unwrap();
    let maker = h.identity("u1", "Acme Mills", Some("manufacturer")).await.unwrap();
    let buyer = h.identity("u2", "Bulk Co", Some("wholesaler")).await.unwrap();
    let (mut caller, _rx1) = h.connect(&maker);
    let (_callee, mut callee_rx) = h.connect(&buyer);

    let create = || ClientFrame::CreateDirectRoom {
        request_id: Some("d".to_string()),
        member_id: buyer.id.clone(),
    };
    let first = match caller.handle(create()).await {
        Some(ServerFrame::DirectRoom { room, .. }) => room,
        other => panic!("expected direct_room, got {other:?}"),
    };
    assert_eq!(first.kind, RoomKind::Direct);
    assert_eq!(first.name.as_deref(), Some("Bulk Co"));

    match callee_rx.recv().await {
        Some(ServerFrame::DirectRoomCreated { room }) => {
            assert_eq!(room.id, first.id);
            assert_eq!(room.name.as_deref(), Some("Acme Mills"));
        }
        other => panic!("expected direct_room_created, got {other:?}"),
    }

    let second = match caller.handle(create()).await {
        Some(ServerFrame::DirectRoom { room, .. }) => room,
        other => panic!("expected direct_room, got {other:?}"),
    };
    assert_eq!(second.id, first.id);
    assert!(callee_rx.try_recv().is_err());
}

#[tokio::test]
async fn direct_room_role_policy() {
    let h = TestHarness::builder()
        .with_direct_pair_roles(&["manufacturer", "wholesaler"])
        .build()
        .await
        .unwrap();
    let maker = h.identity("u1", "Acme", Some("manufacturer")).await.unwrap();
    let buyer = h.identity("u2", "Bulk", Some("wholesaler")).await.unwrap();
    let rival = h.identity("u3", "Other", Some("wholesaler")).await.unwrap();
    let guest = h.identity("u4", "Guest", None).await.unwrap();

    assert!(h.service.open_direct_room(&maker, &buyer.id).await.is_ok());
    let same_role = h.service.open_direct_room(&buyer, &rival.id).await.unwrap_err();
    assert_eq!(same_role.code(), "not_authorized");
    let no_role = h.service.open_direct_room(&guest, &maker.id).await.unwrap_err();
    assert_eq!(no_role.code(), "not_authorized");
    let alone = h.service.open_direct_room(&maker, &maker.id).await.unwrap_err();
    assert_eq!(alone.code(), "validation_failed");
    let missing = h
        .service
        .open_direct_room(&maker, &UserId::from("ghost"))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), "not_found");
}

#[tokio::test]
async fn cache_outage_degrades_to_store() {
    let h = TestHarness::builder().with_failing_cache().build().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);

    history_of(session.handle(join(&room.id)).await);
    session.send(&room.id, "still works").await.unwrap();
    let history = history_of(session.handle(join(&room.id)).await);
    assert_eq!(bodies(&history), ["still works"]);
    let older = session.load_more(&room.id, history[0].id).await.unwrap();
    assert!(older.is_empty());
}

#[tokio::test]
async fn failed_cache_write_falls_back_to_store_history() {
    let h = TestHarness::builder().with_flaky_cache().build().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);

    history_of(session.handle(join(&room.id)).await);
    session.send(&room.id, "one").await.unwrap();
    session.send(&room.id, "two").await.unwrap();

    h.flaky.as_ref().unwrap().fail_next_writes(1);
    session.send(&room.id, "three").await.unwrap();
    session.send(&room.id, "four").await.unwrap();

    // The room went cold when "three" missed the cache.
    assert!(h.cache.read(&room.id).await.unwrap().is_empty());

    let (mut later, _rx2) = h.connect(&u1);
    let history = history_of(later.handle(join(&room.id)).await);
    assert_eq!(bodies(&history), ["one", "two", "three", "four"]);
    assert_eq!(h.cache.read(&room.id).await.unwrap(), history);
    assert_eq!(h.store.list_recent(&room.id, 20).await.unwrap(), history);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_rewarms_with_identical_history() {
    let h = TestHarness::new().await.unwrap();
    let u1 = h.identity("u1", "Ana", None).await.unwrap();
    let room = h.open_room("General Chat").await.unwrap();
    let (mut session, _rx) = h.connect(&u1);
    history_of(session.handle(join(&room.id)).await);
    for body in ["a", "b", "c"] {
        session.send(&room.id, body).await.unwrap();
    }
    let before = history_of(session.handle(join(&room.id)).await);
    assert_eq!(h.cache.read(&room.id).await.unwrap(), before);

    tokio::time::advance(Duration::from_secs(25 * 60 * 60)).await;
    assert!(h.cache.read(&room.id).await.unwrap().is_empty());

    let (mut later, _rx2) = h.connect(&u1);
    let after = history_of(later.handle(join(&room.id)).await);
    assert_eq!(after, before);
    assert_eq!(h.cache.read(&room.id).await.unwrap(), before);
}
