use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VibeError {
    #[error("Vibe '{id}' not found. Available vibes: {available:?}")]
    VibeNotFound { id: String, available: Vec<String> },

    #[error("Vibe '{0}' is an advisor; advisors use rule tables, not scoring")]
    AdvisorNotScorable(String),

    #[error("Vibe '{0}' declares no parameters")]
    NoParameters(String),

    #[error("Failed to parse vibe catalog")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read vibe catalog '{0}'")]
    CatalogRead(PathBuf, #[source] std::io::Error),
}
