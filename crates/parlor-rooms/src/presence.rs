// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local presence: which identities have live connections here.
//!
//! Used for targeted delivery that is not tied to a room, such as telling a
//! user that a direct room was opened with them. A miss means "offline" and
//! targeted frames to offline identities are dropped.

use dashmap::DashMap;
use parlor_core::UserId;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::protocol::ServerFrame;

/// Identifies one transport connection.
pub type ConnectionId = Uuid;

/// Outbound queue of one connection.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub conn_id: ConnectionId,
    pub outbound: mpsc::Sender<ServerFrame>,
}

/// Identity -> connected endpoints on this process.
#[derive(Default)]
pub struct PresenceRegistry {
    entries: DashMap<UserId, Vec<Endpoint>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint for `user`.
    pub fn set(&self, user: &UserId, endpoint: Endpoint) {
        let mut entry = self.entries.entry(user.clone()).or_default();
        entry.retain(|e| e.conn_id != endpoint.conn_id);
        entry.push(endpoint);
        debug!(user = %user, connections = entry.len(), "presence set");
    }

    /// Live endpoints of `user`; empty when offline.
    pub fn get(&self, user: &UserId) -> Vec<Endpoint> {
        self.entries
            .get(user)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.entries.contains_key(user)
    }

    /// Remove one endpoint. Returns `true` when it was the user's last one.
    pub fn clear(&self, user: &UserId, conn_id: ConnectionId) -> bool {
        let now_empty = match self.entries.get_mut(user) {
            Some(mut entry) => {
                entry.retain(|e| e.conn_id != conn_id);
                entry.is_empty()
            }
            None => return false,
        };
        if now_empty {
            self.entries.remove_if(user, |_, endpoints| endpoints.is_empty());
            debug!(user = %user, "presence cleared");
        }
        now_empty
    }

    /// Push `frame` to every endpoint of `user` without waiting.
    ///
    /// Returns how many endpoints accepted it. Full or closed queues are skipped.
    pub fn notify(&self, user: &UserId, frame: ServerFrame) -> usize {
        let endpoints = self.get(user);
        let mut delivered = 0;
        for endpoint in endpoints {
            match endpoint.outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    trace!(user = %user, conn = %endpoint.conn_id, error = %e, "targeted frame dropped");
                }
            }
        }
        delivered
    }

    /// Number of identities online on this process.
    pub fn online_count(&self) -> usize {
        self.entries.len()
    }
}
