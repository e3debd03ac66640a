use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Crate-wide error type.
///
/// `Clone` so that a context can hand the same retained cause to every
/// observer. Non-cloneable sources are kept behind an `Arc` or as text.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bad status {status} from {url}")]
    BadStatus { url: String, status: u16 },

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl Error {
    /// True for a context that expired by deadline, as opposed to an
    /// explicit cancellation cause.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Error::DeadlineExceeded)
    }

    /// True for any failure coming out of the fetch collaborator.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::BadStatus { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
