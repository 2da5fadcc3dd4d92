//! Mapping of engine and request errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use visaflow_core::ValidationError;
use visaflow_engine::EngineError;

/// Every error a handler can return. Rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    Engine(EngineError),
    BadRequest(String),
    Forbidden(String),
}

impl ApiError {
    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Engine(e) => {
                let status = match e {
                    EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                    EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                    EngineError::ExhaustedSequence { .. }
                    | EngineError::DuplicateIdentifier { .. }
                    | EngineError::Conflict { .. } => StatusCode::CONFLICT,
                    EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Engine(EngineError::Validation(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            ApiError::Engine(e) => e.to_string(),
            ApiError::BadRequest(m) | ApiError::Forbidden(m) => m.clone(),
        };
        if status.is_server_error() {
            error!(%message, "request failed");
        }
        super::json_error(status, kind, &message).into_response()
    }
}
