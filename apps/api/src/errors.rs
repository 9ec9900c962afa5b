use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller is not authenticated in the candidate role.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// No resume loaded, or no job vacancies to match against.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// An internally-sourced job that does not resolve to an owning organization.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Submission error: {0}")]
    Submission(String),

    /// Required application fields are absent. `missing` names each one.
    #[error("Missing required application data: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("Application for job {0} is already in progress")]
    InProgress(String),

    #[error("Match run was superseded by a newer run or cleared inputs")]
    RunSuperseded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, also used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::MissingInput(_) => "MISSING_INPUT",
            AppError::DataIntegrity(_) => "DATA_INTEGRITY_ERROR",
            AppError::Scoring(_) => "SCORING_ERROR",
            AppError::Submission(_) => "SUBMISSION_ERROR",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::InProgress(_) => "IN_PROGRESS",
            AppError::RunSuperseded => "RUN_SUPERSEDED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::MissingInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DataIntegrity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Scoring(msg) => {
                tracing::error!("Scoring error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Submission(msg) => {
                tracing::error!("Submission error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InProgress(_) | AppError::RunSuperseded => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if let AppError::Validation { missing } = &self {
            error["missing_fields"] = json!(missing);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
