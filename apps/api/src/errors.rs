use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::reconcile::ReconcileError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Reconcile(ReconcileError::DictionaryUnavailable(e)) => {
                tracing::error!("Skills dictionary error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DICTIONARY_UNAVAILABLE",
                    "The skills dictionary is unreachable; retry the ingestion".to_string(),
                )
            }
            AppError::Reconcile(ReconcileError::IndexUnavailable(e)) => {
                tracing::error!("Semantic index error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "INDEX_UNAVAILABLE",
                    "The semantic skill index is unreachable; retry, or resync once it recovers"
                        .to_string(),
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
