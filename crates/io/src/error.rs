//! Error types for the IO adapters.

use carhart_traits::{SinkError, SourceError};

/// Errors raised by file, network and CSV adapters.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A factor file has no header row.
    #[error("no header row found in {0}")]
    MissingHeader(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Status code returned.
        status: u16,
    },

    /// Zip archive error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive holds no CSV file.
    #[error("no CSV entry in archive {0}")]
    MissingArchiveEntry(String),

    /// Yahoo Finance client error.
    #[error("Yahoo Finance error: {0}")]
    Yahoo(String),

    /// Date outside the range the client can represent.
    #[error("time conversion error: {0}")]
    TimeConversion(String),
}

impl From<IoError> for SourceError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => Self::Io(e),
            IoError::Yahoo(e) => Self::Unreachable(e),
            IoError::Http(e) => Self::Unreachable(e.to_string()),
            err @ IoError::HttpStatus { .. } => Self::Unreachable(err.to_string()),
            other => Self::malformed("carhart-io", other.to_string()),
        }
    }
}

impl From<IoError> for SinkError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => Self::Io(e),
            other => Self::Serialization(other.to_string()),
        }
    }
}
