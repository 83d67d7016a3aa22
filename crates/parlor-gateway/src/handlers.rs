// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parlor_core::{
    HealthStatus, Identity, Message, MessageId, PluginAdapter, RoomId, RoomSummary, UserId,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Largest page served by GET /v1/rooms/{id}/messages.
const MAX_PAGE: usize = 100;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", "degraded", or "unavailable".
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
    pub cache: String,
    pub bus: String,
    pub online: usize,
}

/// Response body for GET /v1/rooms/{id}/members.
#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub room_id: RoomId,
    pub members: Vec<UserId>,
}

/// Query string for GET /v1/rooms/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub before: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response body for GET /v1/rooms/{id}/messages.
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub room_id: RoomId,
    pub messages: Vec<Message>,
}

/// Request body for POST /v1/rooms/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

/// Request body for POST /v1/rooms/direct.
#[derive(Debug, Deserialize)]
pub struct DirectRoomRequest {
    pub member_id: UserId,
}

fn describe(result: Result<HealthStatus, parlor_core::ParlorError>) -> (String, bool, bool) {
    match result {
        Ok(HealthStatus::Healthy) => ("healthy".to_string(), true, true),
        Ok(HealthStatus::Degraded(reason)) => (format!("degraded: {reason}"), true, false),
        Ok(HealthStatus::Unhealthy(reason)) => (format!("unhealthy: {reason}"), false, false),
        Err(e) => (format!("unhealthy: {e}"), false, false),
    }
}

/// GET /health
///
/// The store decides availability; cache or bus trouble only degrades.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let service = &state.service;
    let (store, store_up, store_ok) = describe(service.store().health_check().await);
    let (cache, _, cache_ok) = describe(service.cache().health_check().await);
    let (bus, _, bus_ok) = describe(service.bus().health_check().await);

    let (status, code) = if !store_up {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    } else if store_ok && cache_ok && bus_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::OK)
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        store,
        cache,
        bus,
        online: service.presence().online_count(),
    };
    (code, Json(body)).into_response()
}

/// GET /v1/rooms/{id}/members
pub async fn get_members(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
) -> Result<Json<MembersResponse>, ApiError> {
    let room_id = RoomId(room_id);
    let members = state.service.members(&identity.id, &room_id).await?;
    Ok(Json(MembersResponse { room_id, members }))
}

/// GET /v1/rooms/{id}/messages?before=&limit=
///
/// Without `before`, returns the latest messages. Pages are oldest-first.
pub async fn get_messages(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let room_id = RoomId(room_id);
    let service = &state.service;
    service.authorize(&identity.id, &room_id).await?;

    let limit = query
        .limit
        .unwrap_or(service.policy().history_limit)
        .clamp(1, MAX_PAGE);
    let messages = match query.before {
        Some(before) => service.page_before(&room_id, MessageId(before), limit).await?,
        None => {
            let mut latest = service.history(&room_id).await?;
            let skip = latest.len().saturating_sub(limit);
            latest.drain(..skip);
            latest
        }
    };
    Ok(Json(MessagesResponse { room_id, messages }))
}

/// POST /v1/rooms/{id}/messages
pub async fn post_message(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(room_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let room_id = RoomId(room_id);
    state.service.authorize(&identity.id, &room_id).await?;
    let message = state
        .service
        .send(&identity.id, &room_id, &body.body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /v1/rooms/direct
pub async fn post_direct_room(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<DirectRoomRequest>,
) -> Result<Json<RoomSummary>, ApiError> {
    let room = state
        .service
        .open_direct_room(&identity, &body.member_id)
        .await?;
    Ok(Json(room))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_query_fields_are_optional() {
        let q: MessagesQuery = serde_json::from_str("{}").unwrap();
        assert!(q.before.is_none());
        assert!(q.limit.is_none());
    }

    #[test]
    fn health_description() {
        assert_eq!(describe(Ok(HealthStatus::Healthy)), ("healthy".to_string(), true, true));
        let (text, up, ok) = describe(Ok(HealthStatus::Degraded("lagging".into())));
        assert_eq!(text, "degraded: lagging");
        assert!(up && !ok);
    }
}
