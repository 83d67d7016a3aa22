// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room operations shared by the real-time session and the REST routes.
//!
//! The service owns no state of its own: the store is authoritative, the
//! cache is an accelerator that may fail or forget at any time, and the bus
//! carries events to every process. Cache failures are logged and the
//! operation continues against the store.

use std::sync::Arc;

use parlor_config::model::RoomsConfig;
use parlor_core::{
    FanoutBus, Identity, Message, MessageId, ParlorError, PresenceStatus, RecencyCache, Room,
    RoomEvent, RoomId, RoomStore, RoomSummary, UserId,
};
use tracing::{debug, info, warn};

use crate::presence::PresenceRegistry;
use crate::protocol::ServerFrame;

/// Room rules applied by the service.
#[derive(Debug, Clone)]
pub struct RoomPolicy {
    /// Page size for join history and pagination.
    pub history_limit: usize,
    pub max_body_chars: usize,
    /// Roles allowed to pair in a direct room. Empty disables the check.
    pub direct_pair_roles: Vec<String>,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self::from(&RoomsConfig::default())
    }
}

impl From<&RoomsConfig> for RoomPolicy {
    fn from(config: &RoomsConfig) -> Self {
        Self {
            history_limit: config.history_limit.max(1),
            max_body_chars: config.max_body_chars,
            direct_pair_roles: config.direct_pair_roles.clone(),
        }
    }
}

/// Room operations over injected backends.
pub struct RoomService {
    store: Arc<dyn RoomStore>,
    cache: Arc<dyn RecencyCache>,
    bus: Arc<dyn FanoutBus>,
    presence: Arc<PresenceRegistry>,
    policy: RoomPolicy,
    origin: String,
}

impl RoomService {
    pub fn new(
        store: Arc<dyn RoomStore>,
        cache: Arc<dyn RecencyCache>,
        bus: Arc<dyn FanoutBus>,
        presence: Arc<PresenceRegistry>,
        policy: RoomPolicy,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            bus,
            presence,
            policy,
            origin: origin.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn RecencyCache> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<dyn FanoutBus> {
        &self.bus
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    pub fn policy(&self) -> &RoomPolicy {
        &self.policy
    }

    /// Instance id stamped on published events.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Load a room and check that `user` may enter it.
    pub async fn authorize(&self, user: &UserId, room_id: &RoomId) -> Result<Room, ParlorError> {
        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or_else(|| ParlorError::NotFound(format!("room {room_id}")))?;
        if !room.admits(user) {
            debug!(user = %user, room = %room_id, "room access denied");
            return Err(ParlorError::NotAuthorized(format!("room {room_id}")));
        }
        Ok(room)
    }

    /// Authorize `user` for a room and record them as a member of open rooms.
    pub async fn enroll(&self, user: &UserId, room_id: &RoomId) -> Result<Room, ParlorError> {
        let mut room = self.authorize(user, room_id).await?;
        if !room.is_member(user) {
            self.store.add_member(room_id, user).await?;
            debug!(user = %user, room = %room_id, "member added to open room");
            room.members.push(user.clone());
        }
        Ok(room)
    }

    /// Latest messages of a room, oldest-first.
    ///
    /// Served from the cache when warm; otherwise read from the store and
    /// used to warm the cache.
    pub async fn history(&self, room_id: &RoomId) -> Result<Vec<Message>, ParlorError> {
        let limit = self.policy.history_limit;
        match self.cache.read(room_id).await {
            Ok(cached) if !cached.is_empty() => {
                debug!(room = %room_id, count = cached.len(), "history served from cache");
                let skip = cached.len().saturating_sub(limit);
                return Ok(cached.into_iter().skip(skip).collect());
            }
            Ok(_) => {}
            Err(e) => warn!(room = %room_id, error = %e, "cache read failed, using store"),
        }

        let messages = self.store.list_recent(room_id, limit).await?;
        if let Err(e) = self.cache.warm(room_id, &messages).await {
            warn!(room = %room_id, error = %e, "cache warm failed (non-fatal)");
        }
        debug!(room = %room_id, count = messages.len(), "history served from store");
        Ok(messages)
    }

    /// Validate, persist, cache, and publish a message.
    ///
    /// Membership is checked by the caller. A message that was persisted is
    /// returned even if the publish fails, since the store already holds it.
    pub async fn send(
        &self,
        sender: &UserId,
        room_id: &RoomId,
        body: &str,
    ) -> Result<Message, ParlorError> {
        if body.trim().is_empty() {
            return Err(ParlorError::ValidationFailed(
                "message body must not be empty".into(),
            ));
        }
        if body.chars().count() > self.policy.max_body_chars {
            return Err(ParlorError::ValidationFailed(format!(
                "message body exceeds {} characters",
                self.policy.max_body_chars
            )));
        }

        let message = self.store.append_message(room_id, sender, body).await?;
        if let Err(e) = self.cache.write(room_id, &message).await {
            warn!(room = %room_id, error = %e, "cache write failed, invalidating room");
            if let Err(e) = self.cache.invalidate(room_id).await {
                warn!(room = %room_id, error = %e, "cache invalidation failed");
            }
        }
        if let Err(e) = self
            .bus
            .publish(RoomEvent::message(&self.origin, message.clone()))
            .await
        {
            warn!(room = %room_id, message_id = %message.id, error = %e, "message publish failed");
        }
        debug!(room = %room_id, message_id = %message.id, "message accepted");
        Ok(message)
    }

    /// One page of messages strictly older than `before`, oldest-first.
    ///
    /// An empty page means there is nothing older.
    pub async fn load_more(
        &self,
        room_id: &RoomId,
        before: MessageId,
    ) -> Result<Vec<Message>, ParlorError> {
        self.page_before(room_id, before, self.policy.history_limit)
            .await
    }

    /// [`load_more`](Self::load_more) with an explicit page size.
    pub async fn page_before(
        &self,
        room_id: &RoomId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<Message>, ParlorError> {
        let limit = limit.max(1);
        match self.cache.read_before(room_id, before, limit).await {
            Ok(cached) if cached.len() >= limit => {
                debug!(room = %room_id, before = %before, "page served from cache");
                return Ok(cached);
            }
            Ok(_) => {}
            Err(e) => warn!(room = %room_id, error = %e, "cache page read failed, using store"),
        }

        let page = self.store.list_before(room_id, before, limit).await?;
        if !page.is_empty() {
            if let Err(e) = self.cache.backfill(room_id, before, &page).await {
                warn!(room = %room_id, error = %e, "cache backfill failed (non-fatal)");
            }
        }
        Ok(page)
    }

    /// Find or create the direct room between `caller` and `member_id`.
    ///
    /// The reply is labelled with the counterpart's name. When the room is
    /// new, the counterpart's live connections get a `direct_room_created`
    /// push labelled with the caller's name.
    pub async fn open_direct_room(
        &self,
        caller: &Identity,
        member_id: &UserId,
    ) -> Result<RoomSummary, ParlorError> {
        if *member_id == caller.id {
            return Err(ParlorError::ValidationFailed(
                "cannot open a direct room with yourself".into(),
            ));
        }
        let member = self
            .store
            .get_identity(member_id)
            .await?
            .ok_or_else(|| ParlorError::NotFound(format!("identity {member_id}")))?;
        self.check_pair_roles(caller, &member)?;

        let (room, created) = self
            .store
            .find_or_create_direct_room(&caller.id, &member.id)
            .await?;
        if created {
            info!(room = %room.id, "direct room created");
            let pushed = self.presence.notify(
                &member.id,
                ServerFrame::DirectRoomCreated {
                    room: room.summary(Some(caller.name.clone())),
                },
            );
            debug!(room = %room.id, pushed, "counterpart notified");
        }
        Ok(room.summary(Some(member.name)))
    }

    fn check_pair_roles(&self, caller: &Identity, member: &Identity) -> Result<(), ParlorError> {
        let allowed = &self.policy.direct_pair_roles;
        if allowed.is_empty() {
            return Ok(());
        }
        fn listed<'a>(identity: &'a Identity, allowed: &[String]) -> Option<&'a str> {
            identity
                .role
                .as_deref()
                .filter(|role| allowed.iter().any(|a| a == role))
        }
        match (listed(caller, allowed), listed(member, allowed)) {
            (Some(a), Some(b)) if a != b => Ok(()),
            _ => Err(ParlorError::NotAuthorized(
                "direct rooms are not allowed between these roles".into(),
            )),
        }
    }

    /// Publish a presence change for `user` in `room_id`. Failures are logged.
    pub async fn announce_presence(
        &self,
        room_id: &RoomId,
        user: &UserId,
        status: PresenceStatus,
    ) {
        let event = RoomEvent::presence(&self.origin, room_id.clone(), user.clone(), status);
        if let Err(e) = self.bus.publish(event).await {
            warn!(room = %room_id, user = %user, error = %e, "presence publish failed");
        }
    }

    /// Members of a room the requester may see.
    pub async fn members(
        &self,
        requester: &UserId,
        room_id: &RoomId,
    ) -> Result<Vec<UserId>, ParlorError> {
        Ok(self.authorize(requester, room_id).await?.members)
    }
}
