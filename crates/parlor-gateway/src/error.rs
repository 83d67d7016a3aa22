// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`ParlorError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parlor_core::ParlorError;
use parlor_rooms::ErrorBody;
use serde::Serialize;

/// Error response body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// A [`ParlorError`] returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub ParlorError);

impl From<ParlorError> for ApiError {
    fn from(err: ParlorError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &ParlorError) -> StatusCode {
    match err {
        ParlorError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ParlorError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        ParlorError::NotFound(_) => StatusCode::NOT_FOUND,
        ParlorError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        ParlorError::Conflict(_) => StatusCode::CONFLICT,
        ParlorError::StoreUnavailable { .. }
        | ParlorError::CacheUnavailable { .. }
        | ParlorError::Bus { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ParlorError::Config(_) | ParlorError::Gateway { .. } | ParlorError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: ErrorBody::from(&self.0),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            status_for(&ParlorError::AuthenticationRequired),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&ParlorError::NotAuthorized("r".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&ParlorError::ValidationFailed("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ParlorError::store(std::io::Error::other("locked"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_body_serializes_code_and_message() {
        let body = ErrorResponse {
            error: ErrorBody::from(&ParlorError::NotFound("room r9".into())),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["message"], "not found: room r9");
    }
}
