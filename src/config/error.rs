use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("threads should be at least 1")]
    InvalidThreads,

    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),
}
