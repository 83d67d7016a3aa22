// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the `RoomStore` and `SessionResolver` traits.

use async_trait::async_trait;
use tracing::debug;

use parlor_core::{
    AdapterType, HealthStatus, Identity, Message, MessageId, NewRoom, ParlorError, PluginAdapter,
    Room, RoomId, RoomStore, SessionResolver, UserId,
};

use crate::database::Database;
use crate::queries;

async fn ping(db: &Database) -> Result<HealthStatus, ParlorError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.query_row("SELECT 1", [], |_| Ok(()))
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(HealthStatus::Healthy)
}

/// SQLite-backed room and message store.
///
/// Delegates every operation to the typed query modules. Clones of the
/// wrapped [`Database`] share the single writer thread.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The wrapped database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        ping(&self.db).await
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl RoomStore for SqliteStore {
    async fn get_room(&self, id: &RoomId) -> Result<Option<Room>, ParlorError> {
        queries::rooms::get_room(&self.db, id).await
    }

    async fn find_direct_room(&self, a: &UserId, b: &UserId) -> Result<Option<Room>, ParlorError> {
        queries::rooms::find_direct_room(&self.db, a, b).await
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room, ParlorError> {
        queries::rooms::create_room(&self.db, room).await
    }

    async fn find_or_create_direct_room(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<(Room, bool), ParlorError> {
        queries::rooms::find_or_create_direct_room(&self.db, a, b).await
    }

    async fn ensure_shared_room(&self, name: &str) -> Result<Room, ParlorError> {
        queries::rooms::ensure_shared_room(&self.db, name).await
    }

    async fn add_member(&self, room: &RoomId, user: &UserId) -> Result<(), ParlorError> {
        queries::rooms::add_member(&self.db, room, user).await
    }

    async fn append_message(
        &self,
        room: &RoomId,
        sender: &UserId,
        body: &str,
    ) -> Result<Message, ParlorError> {
        queries::messages::append_message(&self.db, room, sender, body).await
    }

    async fn list_recent(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, ParlorError> {
        queries::messages::list_recent(&self.db, room, limit).await
    }

    async fn list_before(
        &self,
        room: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        queries::messages::list_before(&self.db, room, before, limit).await
    }

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, ParlorError> {
        queries::identities::get_identity(&self.db, id).await
    }
}

/// Resolves web session cookies against the `web_sessions` table.
pub struct SqliteSessionResolver {
    db: Database,
}

impl SqliteSessionResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteSessionResolver {
    fn name(&self) -> &str {
        "sqlite-sessions"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Auth
    }

    async fn health_check(&self) -> Result<HealthStatus, ParlorError> {
        ping(&self.db).await
    }

    async fn shutdown(&self) -> Result<(), ParlorError> {
        Ok(())
    }
}

#[async_trait]
impl SessionResolver for SqliteSessionResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, ParlorError> {
        queries::identities::resolve_session(&self.db, token).await
    }
}
