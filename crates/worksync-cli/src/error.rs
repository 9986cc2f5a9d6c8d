use std::path::PathBuf;

use thiserror::Error;
use worksync_core::models::CoreError;
use worksync_server::ServerError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("database '{}' does not exist", .0.display())]
    DatabaseMissing(PathBuf),

    #[error("no stored state for user '{0}'")]
    UserNotFound(String),
}
