// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite store through its trait objects.

use std::sync::Arc;

use parlor_core::{
    AdapterType, HealthStatus, Identity, NewRoom, PluginAdapter, RoomKind, RoomStore,
    SessionResolver, UserId,
};
use parlor_storage::queries::identities::{create_web_session, upsert_identity};
use parlor_storage::{Database, SqliteSessionResolver, SqliteStore};
use tempfile::tempdir;

#[tokio::test]
async fn store_round_trip_through_trait_object() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("parlor.db").to_str().unwrap())
        .await
        .unwrap();
    let store: Arc<dyn RoomStore> = Arc::new(SqliteStore::new(db));

    assert_eq!(store.adapter_type(), AdapterType::Store);
    assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

    let room = store
        .create_room(NewRoom {
            kind: RoomKind::Shared,
            members: vec![UserId::from("u1")],
            name: Some("Buyers".to_string()),
            restricted: true,
        })
        .await
        .unwrap();

    let sender = UserId::from("u1");
    let mut sent = Vec::new();
    for body in ["a", "b", "c"] {
        sent.push(store.append_message(&room.id, &sender, body).await.unwrap());
    }
    assert_eq!(store.list_recent(&room.id, 3).await.unwrap(), sent);
    assert_eq!(
        store.list_before(&room.id, sent[2].id, 10).await.unwrap(),
        sent[..2].to_vec()
    );

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn resolver_shares_the_database() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("parlor.db").to_str().unwrap())
        .await
        .unwrap();
    let identity = Identity {
        id: UserId::from("u7"),
        name: "Grace".to_string(),
        role: Some("wholesaler".to_string()),
    };
    upsert_identity(&db, &identity).await.unwrap();
    create_web_session(&db, "cookie-value", &identity.id, "2999-12-31T00:00:00.000Z")
        .await
        .unwrap();

    let store = SqliteStore::new(db.clone());
    let resolver = SqliteSessionResolver::new(db);

    assert_eq!(resolver.resolve("cookie-value").await.unwrap(), Some(identity.clone()));
    assert_eq!(store.get_identity(&identity.id).await.unwrap(), Some(identity));
    assert_eq!(resolver.adapter_type(), AdapterType::Auth);
}
