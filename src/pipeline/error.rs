use crate::series::error::SeriesError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Daily table is empty; nothing to aggregate")]
    EmptyDailyTable,

    #[error("Failed processing DataFrame")]
    Polars(#[from] PolarsError),

    #[error("I/O error writing artifact '{0}'")]
    ArtifactIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to atomically replace '{0}'")]
    AtomicReplace(PathBuf, #[source] tempfile::PersistError),

    #[error("Area '{0}' has no center; point extraction requires one")]
    MissingCenter(String),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Raw dump download or write failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
