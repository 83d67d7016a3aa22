// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. Every query is scoped to one room and ordered by id.

use parlor_core::{Message, MessageId, ParlorError, RoomId, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const MESSAGE_COLUMNS: &str = "m.id, m.room_id, m.sender_id, i.name, m.body, m.created_at";

fn map_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: MessageId(row.get(0)?),
        room_id: RoomId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        sender_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Persist a message with a store-assigned id and timestamp.
///
/// Fails with `ValidationFailed` on a blank body and `NotFound` when the room
/// does not exist.
pub async fn append_message(
    db: &Database,
    room: &RoomId,
    sender: &UserId,
    body: &str,
) -> Result<Message, ParlorError> {
    if body.trim().is_empty() {
        return Err(ParlorError::ValidationFailed(
            "message body must not be empty".to_string(),
        ));
    }

    let room_id = room.0.clone();
    let sender_id = sender.0.clone();
    let body = body.to_string();
    let created_at = super::now_timestamp();

    let message = db
        .connection()
        .call(move |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM rooms WHERE id = ?1", params![room_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }
            conn.execute(
                "INSERT INTO messages (room_id, sender_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![room_id, sender_id, body, created_at],
            )?;
            let id = conn.last_insert_rowid();
            let sender_name: Option<String> = conn
                .query_row(
                    "SELECT name FROM identities WHERE id = ?1",
                    params![sender_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(Some(Message {
                id: MessageId(id),
                room_id: RoomId(room_id),
                sender_id: UserId(sender_id),
                sender_name,
                body,
                created_at,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    message.ok_or_else(|| ParlorError::NotFound(format!("room {room}")))
}

/// The newest `limit` messages of a room, oldest-first.
pub async fn list_recent(
    db: &Database,
    room: &RoomId,
    limit: usize,
) -> Result<Vec<Message>, ParlorError> {
    let room_id = room.0.clone();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 LEFT JOIN identities i ON i.id = m.sender_id
                 WHERE m.room_id = ?1
                 ORDER BY m.id DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![room_id, limit], map_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Up to `limit` messages strictly older than `before`, oldest-first.
pub async fn list_before(
    db: &Database,
    room: &RoomId,
    before: MessageId,
    limit: usize,
) -> Result<Vec<Message>, ParlorError> {
    let room_id = room.0.clone();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages m
                 LEFT JOIN identities i ON i.id = m.sender_id
                 WHERE m.room_id = ?1 AND m.id < ?2
                 ORDER BY m.id DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![room_id, before.0, limit], map_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
