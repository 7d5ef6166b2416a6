//! Error types for the financial analyst agents

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Coarse classification used for logging and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The lookup completed but the entity does not exist
    NotFound,
    /// A collaborator failed or produced something unusable
    Transient,
    /// A credential or setting is missing for the service being used
    Configuration,
}

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Domain Errors
    // =============================

    #[error("Invalid or unsupported ticker: {0}")]
    InvalidTicker(String),

    #[error("No search results for '{0}'")]
    NoResults(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =============================
    // Collaborator Failures
    // =============================

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Search service error: {0}")]
    Search(String),

    #[error("Quote service error: {0}")]
    Quote(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistantError::InvalidTicker(_) | AssistantError::NoResults(_) => ErrorKind::NotFound,
            AssistantError::Configuration(_) => ErrorKind::Configuration,
            _ => ErrorKind::Transient,
        }
    }

    /// Only transport-level failures are worth asking again
    pub fn is_retryable(&self) -> bool {
        match self {
            AssistantError::HttpError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e
                        .status()
                        .map(|s| s.is_server_error() || s.as_u16() == 429)
                        .unwrap_or(false)
            }
            AssistantError::Api { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }
}
