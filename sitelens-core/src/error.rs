use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Page store could not be built: {0}")]
    PageStore(String),

    #[error("Invalid input in {source_name}: {message}")]
    InvalidInput { source_name: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("HTML selector error: {0}")]
    Selector(String),

    #[error("Rule evaluation failed: {0}")]
    Rule(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
