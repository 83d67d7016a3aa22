// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end room tests.
//!
//! `TestHarness` assembles the room stack over a temp SQLite database, an
//! in-process cache, and a recording local bus, and provides helpers to seed
//! identities, web sessions, and rooms.

use std::sync::Arc;
use std::time::Duration;

use parlor_cache::MemoryCache;
use parlor_config::model::RoomsConfig;
use parlor_core::{
    Identity, NewRoom, ParlorError, RecencyCache, Room, RoomKind, RoomStore, UserId,
};
use parlor_rooms::{ConnectionSession, PresenceRegistry, RoomPolicy, RoomService, ServerFrame};
use parlor_storage::queries::identities;
use parlor_storage::{Database, SqliteSessionResolver, SqliteStore};
use tokio::sync::mpsc;

use crate::mock_bus::RecordingBus;
use crate::mock_cache::{FailingCache, FlakyCache};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    rooms: RoomsConfig,
    cache_entries: usize,
    cache_ttl: Duration,
    failing_cache: bool,
    flaky_cache: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            rooms: RoomsConfig::default(),
            cache_entries: 20,
            cache_ttl: DAY,
            failing_cache: false,
            flaky_cache: false,
        }
    }

    /// Restrict direct rooms to pairs of these roles.
    pub fn with_direct_pair_roles(mut self, roles: &[&str]) -> Self {
        self.rooms.direct_pair_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.rooms.history_limit = limit;
        self
    }

    pub fn with_cache_entries(mut self, entries: usize) -> Self {
        self.cache_entries = entries;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replace the memory cache with one that always fails.
    pub fn with_failing_cache(mut self) -> Self {
        self.failing_cache = true;
        self
    }

    /// Wrap the memory cache so individual writes can be made to fail.
    pub fn with_flaky_cache(mut self) -> Self {
        self.flaky_cache = true;
        self
    }

    /// Build the harness.
    pub async fn build(self) -> Result<TestHarness, ParlorError> {
        let temp_dir = tempfile::TempDir::new().map_err(ParlorError::store)?;
        let db_path = temp_dir.path().join("parlor-test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let store = Arc::new(SqliteStore::new(db.clone()));
        let resolver = Arc::new(SqliteSessionResolver::new(db.clone()));
        let memory: Arc<dyn RecencyCache> =
            Arc::new(MemoryCache::new(self.cache_entries, 200, self.cache_ttl));
        let flaky = self.flaky_cache.then(|| Arc::new(FlakyCache::new(memory.clone())));
        let cache: Arc<dyn RecencyCache> = if self.failing_cache {
            Arc::new(FailingCache::new())
        } else if let Some(flaky) = &flaky {
            flaky.clone()
        } else {
            memory
        };
        let bus = Arc::new(RecordingBus::new(64));
        let presence = Arc::new(PresenceRegistry::new());
        let service = Arc::new(RoomService::new(
            store.clone(),
            cache.clone(),
            bus.clone(),
            presence.clone(),
            RoomPolicy::from(&self.rooms),
            "test-node",
        ));

        Ok(TestHarness {
            service,
            store,
            resolver,
            cache,
            bus,
            presence,
            db,
            flaky,
            _temp_dir: temp_dir,
        })
    }
}

/// In-process room stack over real adapters.
pub struct TestHarness {
    pub service: Arc<RoomService>,
    pub store: Arc<SqliteStore>,
    pub resolver: Arc<SqliteSessionResolver>,
    pub cache: Arc<dyn RecencyCache>,
    pub bus: Arc<RecordingBus>,
    pub presence: Arc<PresenceRegistry>,
    pub db: Database,
    /// Set when built with [`TestHarnessBuilder::with_flaky_cache`].
    pub flaky: Option<Arc<FlakyCache>>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, ParlorError> {
        Self::builder().build().await
    }

    /// Add an identity to the directory.
    pub async fn identity(
        &self,
        id: &str,
        name: &str,
        role: Option<&str>,
    ) -> Result<Identity, ParlorError> {
        let identity = Identity {
            id: UserId::from(id),
            name: name.to_string(),
            role: role.map(str::to_string),
        };
        identities::upsert_identity(&self.db, &identity).await?;
        Ok(identity)
    }

    /// Issue a web session token for `user`, valid for `ttl` from now.
    pub async fn session_token(&self, user: &UserId, ttl: chrono::Duration) -> Result<String, ParlorError> {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = (chrono::Utc::now() + ttl)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        identities::create_web_session(&self.db, &token, user, &expires_at).await?;
        Ok(token)
    }

    /// Open shared room anyone may join.
    pub async fn open_room(&self, name: &str) -> Result<Room, ParlorError> {
        self.store.ensure_shared_room(name).await
    }

    /// Shared room restricted to `members`.
    pub async fn restricted_room(
        &self,
        name: &str,
        members: &[&Identity],
    ) -> Result<Room, ParlorError> {
        self.store
            .create_room(NewRoom {
                kind: RoomKind::Shared,
                members: members.iter().map(|m| m.id.clone()).collect(),
                name: Some(name.to_string()),
                restricted: true,
            })
            .await
    }

    /// Direct room between two identities.
    pub async fn direct_room(&self, a: &Identity, b: &Identity) -> Result<Room, ParlorError> {
        Ok(self.store.find_or_create_direct_room(&a.id, &b.id).await?.0)
    }

    /// Open a connection session for `identity` with its outbound queue.
    pub fn connect(&self, identity: &Identity) -> (ConnectionSession, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(64);
        (
            ConnectionSession::open(self.service.clone(), identity.clone(), tx),
            rx,
        )
    }
}
