use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationIndexError {
    #[error("Failed to read data directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
