use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure taxonomy for the extraction and verification pipeline.
///
/// `RateLimited`, `ProfileNotFound`-style negative outcomes are NOT errors;
/// they surface as statuses on the records themselves. Only conditions that
/// prevent a stage from producing its record live here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported content format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode content: {0}")]
    Decode(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit reached: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[from] rocket::Error),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

impl From<mobc::Error<rusqlite::Error>> for PipelineError {
    fn from(err: mobc::Error<rusqlite::Error>) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}
