// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection gate.
//!
//! Resolves the web session presented with a request to an identity. Token
//! sources, checked in order:
//! 1. Session cookie (`auth.cookie_name`)
//! 2. Bearer token (`Authorization: Bearer <token>`)
//! 3. `?token=` query parameter, only when `auth.allow_query_token` is set
//!
//! Unknown or expired sessions are rejected with 401 before any room logic.

use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use parlor_config::model::{AuthConfig, ServerConfig};
use parlor_core::{Identity, ParlorError, SessionResolver};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Gate settings taken from the `auth` and `server` config sections.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub cookie_name: String,
    pub allow_query_token: bool,
    /// Origins allowed to open WebSocket connections. Empty allows any.
    pub allowed_origins: Vec<String>,
}

impl GateConfig {
    pub fn new(auth: &AuthConfig, server: &ServerConfig) -> Self {
        Self {
            cookie_name: auth.cookie_name.clone(),
            allow_query_token: auth.allow_query_token,
            allowed_origins: server.allowed_origins.clone(),
        }
    }

    /// Whether a browser `Origin` header may open a connection.
    pub fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
            Some(origin) => self.allowed_origins.iter().any(|o| o == origin),
            None => true,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new(&AuthConfig::default(), &ServerConfig::default())
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the session token out of a request, if one was presented.
pub fn extract_token(headers: &HeaderMap, uri: &Uri, gate: &GateConfig) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(&gate.cookie_name) {
        let value = cookie.value();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    if gate.allow_query_token {
        if let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(uri) {
            return query.token.filter(|t| !t.is_empty());
        }
    }
    None
}

/// Resolve the request's session to an identity.
pub async fn authenticate(
    resolver: &dyn SessionResolver,
    gate: &GateConfig,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Identity, ParlorError> {
    let Some(token) = extract_token(headers, uri, gate) else {
        debug!("no session token presented");
        return Err(ParlorError::AuthenticationRequired);
    };
    match resolver.resolve(&token).await? {
        Some(identity) => Ok(identity),
        None => {
            debug!("unknown or expired session");
            Err(ParlorError::AuthenticationRequired)
        }
    }
}

/// Middleware that admits requests with a valid session.
///
/// The resolved [`Identity`] is stored in the request extensions.
pub async fn session_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match authenticate(
        state.resolver.as_ref(),
        &state.gate,
        request.headers(),
        request.uri(),
    )
    .await
    {
        Ok(identity) => identity,
        Err(e) => return ApiError(e).into_response(),
    };
    request.extensions_mut().insert(identity);
    next.run(request).await
}
