use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Failed to read source file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Source file '{path}' is not a valid point dump")]
    DataCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
