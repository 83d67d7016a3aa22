// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room and membership operations.

use parlor_core::types::direct_pair_key;
use parlor_core::{NewRoom, ParlorError, Room, RoomId, RoomKind, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

/// Load a room row and its members on the writer thread.
pub(crate) fn load_room(
    conn: &rusqlite::Connection,
    id: &str,
) -> Result<Option<Room>, rusqlite::Error> {
    let row = conn
        .query_row(
            "SELECT id, name, kind, restricted, created_at FROM rooms WHERE id = ?1",
            params![id],
            |row| {
                let kind: String = row.get(2)?;
                let kind = kind.parse::<RoomKind>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(Room {
                    id: RoomId(row.get(0)?),
                    name: row.get(1)?,
                    kind,
                    restricted: row.get(3)?,
                    members: Vec::new(),
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;

    let Some(mut room) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id FROM room_members WHERE room_id = ?1 ORDER BY joined_at ASC, rowid ASC",
    )?;
    let members = stmt.query_map(params![id], |row| Ok(UserId(row.get(0)?)))?;
    for member in members {
        room.members.push(member?);
    }
    Ok(Some(room))
}

/// Fetch a room with its member list.
pub async fn get_room(db: &Database, id: &RoomId) -> Result<Option<Room>, ParlorError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| load_room(conn, &id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the direct room shared by two identities, in either order.
pub async fn find_direct_room(
    db: &Database,
    a: &UserId,
    b: &UserId,
) -> Result<Option<Room>, ParlorError> {
    let key = direct_pair_key(a, b);
    db.connection()
        .call(move |conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM rooms WHERE direct_key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => load_room(conn, &id),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn validate_new_room(room: &NewRoom) -> Result<(), ParlorError> {
    if room.kind == RoomKind::Direct {
        if room.members.len() != 2 || room.members[0] == room.members[1] {
            return Err(ParlorError::ValidationFailed(
                "a direct room needs exactly two distinct members".to_string(),
            ));
        }
    }
    Ok(())
}

/// Create a room and its memberships in one transaction.
///
/// A second direct room for the same pair, or a second open shared room with
/// the same name, is rejected with [`ParlorError::Conflict`].
pub async fn create_room(db: &Database, room: NewRoom) -> Result<Room, ParlorError> {
    validate_new_room(&room)?;

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = super::now_timestamp();
    let direct_key = match room.kind {
        RoomKind::Direct => Some(direct_pair_key(&room.members[0], &room.members[1])),
        RoomKind::Shared => None,
    };
    let restricted = room.restricted || room.kind == RoomKind::Direct;
    let kind = room.kind.to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO rooms (id, name, kind, restricted, direct_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, room.name, kind, restricted, direct_key, created_at],
            )?;
            for member in &room.members {
                tx.execute(
                    "INSERT OR IGNORE INTO room_members (room_id, user_id, joined_at)
                     VALUES (?1, ?2, ?3)",
                    params![id, member.0, created_at],
                )?;
            }
            let created = load_room(&tx, &id)?;
            tx.commit()?;
            Ok(created)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or_else(|| ParlorError::Internal("room vanished after insert".to_string()))
}

/// Atomically return the pair's direct room, creating it when absent.
///
/// Relies on the unique `direct_key` column: concurrent callers race on
/// `INSERT OR IGNORE` and all read back the single winning row.
pub async fn find_or_create_direct_room(
    db: &Database,
    a: &UserId,
    b: &UserId,
) -> Result<(Room, bool), ParlorError> {
    if a == b {
        return Err(ParlorError::ValidationFailed(
            "cannot open a direct room with yourself".to_string(),
        ));
    }

    let key = direct_pair_key(a, b);
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = super::now_timestamp();
    let members = [a.0.clone(), b.0.clone()];

    let (room, created) = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO rooms (id, name, kind, restricted, direct_key, created_at)
                 VALUES (?1, NULL, 'direct', 1, ?2, ?3)",
                params![id, key, created_at],
            )?;
            let created = inserted == 1;
            if created {
                for member in &members {
                    tx.execute(
                        "INSERT INTO room_members (room_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                        params![id, member, created_at],
                    )?;
                }
            }
            let room_id: String = tx.query_row(
                "SELECT id FROM rooms WHERE direct_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            let room = load_room(&tx, &room_id)?;
            tx.commit()?;
            Ok((room, created))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    let room =
        room.ok_or_else(|| ParlorError::Internal("direct room vanished after insert".to_string()))?;
    Ok((room, created))
}

/// Find the open shared room with `name`, creating it when absent.
pub async fn ensure_shared_room(db: &Database, name: &str) -> Result<Room, ParlorError> {
    let name = name.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = super::now_timestamp();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO rooms (id, name, kind, restricted, direct_key, created_at)
                 VALUES (?1, ?2, 'shared', 0, NULL, ?3)",
                params![id, name, created_at],
            )?;
            let room_id: String = conn.query_row(
                "SELECT id FROM rooms WHERE name = ?1 AND kind = 'shared' AND restricted = 0",
                params![name],
                |row| row.get(0),
            )?;
            load_room(conn, &room_id)
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or_else(|| ParlorError::Internal("shared room vanished after insert".to_string()))
}

/// Add a member to a room. Adding an existing member is a no-op.
pub async fn add_member(db: &Database, room: &RoomId, user: &UserId) -> Result<(), ParlorError> {
    let room_id = room.0.clone();
    let user_id = user.0.clone();
    let joined_at = super::now_timestamp();

    let exists = db
        .connection()
        .call(move |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM rooms WHERE id = ?1", params![room_id], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                conn.execute(
                    "INSERT OR IGNORE INTO room_members (room_id, user_id, joined_at)
                     VALUES (?1, ?2, ?3)",
                    params![room_id, user_id, joined_at],
                )?;
            }
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if exists {
        Ok(())
    } else {
        Err(ParlorError::NotFound(format!("room {room}")))
    }
}
