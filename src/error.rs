use std::time::Duration;

use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// The Error type for annotation operations.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Parquet reading error: {source}")]
    ParquetError {
        #[from]
        source: parquet::errors::ParquetError,
    },

    #[error("Arrow conversion error: {source}")]
    ArrowError {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// The whole remote call failed (network, auth, malformed request or
    /// response). Fatal for the enclosing batch. Per-document failures are
    /// data in `BatchResult::errors`, never this variant.
    #[error("Remote analytics error [{code}]: {message}")]
    Remote {
        code: String,
        message: String,
        target: Option<String>,
    },

    /// A unit of work exceeded its deadline. Fatal for the overall
    /// processing call; no partial row set is returned.
    #[error("Unit of work timed out after {limit:?}")]
    Timeout { limit: Duration },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AnalyticsError {
    /// Collapses any failure raised by a client call into the `Remote`
    /// variant, keeping code/message/target untouched when the error is
    /// already remote. Callers of the invoker see one batch-level error
    /// shape no matter where the transport failed.
    pub fn into_remote(self) -> Self {
        match self {
            err @ AnalyticsError::Remote { .. } => err,
            other => AnalyticsError::Remote {
                code: "TransportError".to_string(),
                message: other.to_string(),
                target: None,
            },
        }
    }
}

// reqwest::Error carries no service error body by itself, so plain transport
// failures surface with a fixed code and the transport message. Status and
// body based errors are mapped where the response is read.
impl From<reqwest::Error> for AnalyticsError {
    fn from(err: reqwest::Error) -> Self {
        AnalyticsError::Remote {
            code: "TransportError".to_string(),
            message: err.to_string(),
            target: None,
        }
    }
}
