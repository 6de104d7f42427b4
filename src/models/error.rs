use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::StoreError;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn reply(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (status, Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.into(),
        }))
    }
}

/// Failures of a single protocol message.
///
/// The `Display` strings are sent to clients as the `message` of an `error`
/// event and must stay stable.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not joined to a book session")]
    NotJoined,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid change: {0}")]
    InvalidChange(String),

    #[error("Internal server error")]
    Storage(#[from] StoreError),
}

impl CollabError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CollabError::AuthenticationRequired | CollabError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            CollabError::PermissionDenied => StatusCode::FORBIDDEN,
            CollabError::NotJoined | CollabError::InvalidMessage(_) | CollabError::InvalidChange(_) => StatusCode::BAD_REQUEST,
            CollabError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CollabError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: CollabError) -> Self {
        ErrorResponse::reply(err.status_code(), err.to_string())
    }
}
