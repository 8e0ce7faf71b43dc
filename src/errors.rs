use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rating already exists for rater {rater_id} on movie {movie_id}")]
    DuplicateRating { rater_id: i64, movie_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Store call timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Env error: {0}")]
    EnvError(String),

    #[error("Internal server error")]
    InternalError,
}

impl AppError {
    pub fn to_response(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateRating { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Transaction(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::StoreTimeout(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::EnvError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".into(),
            ),
        }
    }

    /// Maps a driver error, keeping uniqueness and foreign key violations typed.
    pub fn from_sqlx(err: sqlx::Error, context: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                return AppError::NotFound(format!("{context}: referenced movie does not exist"));
            }
        }
        AppError::DatabaseError(format!("{context}: {err}"))
    }
}
