use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table {table} has {found} entries, expected {expected}")]
    TableLength {
        table: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value in table {0}")]
    NonFinite(&'static str),

    #[error("Spectrum not found: {0}")]
    SpectrumNotFound(String),
}
