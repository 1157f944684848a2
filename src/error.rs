use crate::locations::error::LocationIndexError;
use crate::pipeline::error::PipelineError;
use crate::series::error::SeriesError;
use crate::vibes::error::VibeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VibecastError {
    #[error(transparent)]
    LocationIndex(#[from] LocationIndexError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Vibe(#[from] VibeError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
