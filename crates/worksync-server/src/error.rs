use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use worksync_core::models::CoreError;

/// Request-level failures. Bodies are short plain-text strings that the
/// page's sync script shows verbatim.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid json")]
    InvalidJson,

    #[error("missing username")]
    MissingUsername,

    #[error("missing state")]
    MissingState,

    #[error("not found")]
    NotFound,

    #[error("unsupported method")]
    UnsupportedMethod,

    /// The store's message goes back to the client as-is.
    #[error("{}", .0.message)]
    Storage(CoreError),

    #[error("{0}")]
    Internal(String),
}

impl SyncError {
    pub fn status(&self) -> StatusCode {
        match self {
            SyncError::InvalidJson | SyncError::MissingUsername | SyncError::MissingState => {
                StatusCode::BAD_REQUEST
            }
            SyncError::NotFound => StatusCode::NOT_FOUND,
            SyncError::UnsupportedMethod => StatusCode::NOT_IMPLEMENTED,
            SyncError::Storage(_) | SyncError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Startup and serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare database: {0}")]
    Storage(#[from] CoreError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
