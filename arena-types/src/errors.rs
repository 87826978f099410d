use thiserror::Error;

/// Handler-level error taxonomy. Every variant maps to exactly one
/// HTTP status; WebSocket handlers translate into `ScoreRejected` or
/// `Error` emits instead. Nothing here is allowed to crash the
/// process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("admin access required")]
    Authorization,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Authentication(_) => 401,
            ApiError::Authorization => 403,
            ApiError::Validation(_) | ApiError::Duplicate(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Storage(_) => 500,
        }
    }
}
