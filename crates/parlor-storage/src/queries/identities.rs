// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity directory and web-session lookups.
//!
//! The web application owns these tables. Parlor only reads them at runtime;
//! the write helpers exist for provisioning and tests.

use parlor_core::{Identity, ParlorError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

fn map_identity(row: &rusqlite::Row<'_>) -> Result<Identity, rusqlite::Error> {
    Ok(Identity {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        role: row.get(2)?,
    })
}

/// Look up an identity by id.
pub async fn get_identity(db: &Database, id: &UserId) -> Result<Option<Identity>, ParlorError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, role FROM identities WHERE id = ?1",
                params![id],
                map_identity,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or update an identity.
pub async fn upsert_identity(db: &Database, identity: &Identity) -> Result<(), ParlorError> {
    let identity = identity.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO identities (id, name, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, role = excluded.role",
                params![identity.id.0, identity.name, identity.role],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a web session token for an identity, valid until `expires_at` (RFC 3339 UTC).
pub async fn create_web_session(
    db: &Database,
    token: &str,
    identity: &UserId,
    expires_at: &str,
) -> Result<(), ParlorError> {
    let token = token.to_string();
    let identity = identity.0.clone();
    let expires_at = expires_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO web_sessions (token, identity_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token, identity, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve a session token to its identity. Unknown or expired tokens yield `None`.
pub async fn resolve_session(db: &Database, token: &str) -> Result<Option<Identity>, ParlorError> {
    let token = token.to_string();
    let now = super::now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT i.id, i.name, i.role FROM web_sessions s
                 JOIN identities i ON i.id = s.identity_id
                 WHERE s.token = ?1 AND s.expires_at > ?2",
                params![token, now],
                map_identity,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
