use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::exploration::engine::EngineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Engine errors convert via `From`, keeping the status-code mapping in one
/// place and out of the engine itself.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("Regeneration limit reached: {0}")]
    RegenerationLimit(String),

    #[error("Session already complete")]
    SessionComplete,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SessionNotFound(id) => {
                AppError::NotFound(format!("Session {id} not found"))
            }
            EngineError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
            EngineError::Validation(e) => AppError::Validation(e.to_string()),
            EngineError::MissingIdentity
            | EngineError::MissingConfirmation
            | EngineError::MissingModificationRequest => AppError::Validation(err.to_string()),
            EngineError::InvalidIdentity(msg) => AppError::Validation(msg),
            EngineError::RegenerationLimitReached { max } => {
                AppError::RegenerationLimit(format!("limit is {max} regenerations"))
            }
            EngineError::PreconditionNotMet(msg) => AppError::PreconditionNotMet(msg),
            EngineError::AlreadyComplete => AppError::SessionComplete,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg.clone())
            }
            AppError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::PreconditionNotMet(msg) => (
                StatusCode::PRECONDITION_FAILED,
                "PRECONDITION_NOT_MET",
                msg.clone(),
            ),
            AppError::RegenerationLimit(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                "REGENERATION_LIMIT_REACHED",
                msg.clone(),
            ),
            AppError::SessionComplete => (
                StatusCode::GONE,
                "SESSION_COMPLETE",
                "This session has already finished".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::validator::ValidationError;
    use uuid::Uuid;

    #[test]
    fn test_engine_errors_map_to_stable_kinds() {
        assert!(matches!(
            AppError::from(EngineError::SessionNotFound(Uuid::new_v4())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(EngineError::Validation(ValidationError::EmptySelection)),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(EngineError::MissingIdentity),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(EngineError::RegenerationLimitReached { max: 5 }),
            AppError::RegenerationLimit(_)
        ));
        assert!(matches!(
            AppError::from(EngineError::AlreadyComplete),
            AppError::SessionComplete
        ));
        assert!(matches!(
            AppError::from(EngineError::PreconditionNotMet("x".to_string())),
            AppError::PreconditionNotMet(_)
        ));
    }
}
