//! HTTP middleware: API key authentication and caller identification.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use visaflow_core::Role;

use super::state::{Actor, AppState};

/// API key authentication middleware.
///
/// If an API key is configured, all requests (except /health) must include
/// either `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let expected_key = match &state.api_key {
        Some(k) => k,
        None => return next.run(request).await,
    };

    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    if let Some(auth) = auth_header {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            if token == expected_key {
                return next.run(request).await;
            }
            return invalid_key();
        }
    }

    let api_key_header = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    if let Some(key) = api_key_header {
        if key == expected_key {
            return next.run(request).await;
        }
        return invalid_key();
    }

    super::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
        .into_response()
}

fn invalid_key() -> Response {
    super::json_error(StatusCode::FORBIDDEN, "forbidden", "invalid API key").into_response()
}

/// Resolve the caller from `X-Actor-Role` / `X-Actor-Id` and attach it to
/// the request as an [`Actor`] extension. /health needs no caller.
pub(crate) async fn actor_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let pair = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        (header("x-actor-role"), header("x-actor-id"))
    };
    let (role, id) = match pair {
        (Some(role), Some(id)) => (role, id),
        _ => {
            return super::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "X-Actor-Role and X-Actor-Id headers are required",
            )
            .into_response()
        }
    };
    let role: Role = match role.parse() {
        Ok(role) => role,
        Err(e) => {
            return super::json_error(StatusCode::UNAUTHORIZED, "unauthorized", &e.to_string())
                .into_response()
        }
    };

    request.extensions_mut().insert(Actor { role, id });
    next.run(request).await
}
