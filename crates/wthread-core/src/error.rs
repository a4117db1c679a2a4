//! Error types for work-thread operations

use core::fmt;

/// Result type for work-thread operations
pub type WtResult<T> = Result<T, WthreadError>;

/// Errors that can occur when creating or resuming a work thread
#[derive(Debug)]
pub enum WthreadError {
    /// Rejected builder configuration
    InvalidConfig(&'static str),

    /// The OS refused to spawn the worker thread
    Spawn(std::io::Error),
}

impl fmt::Display for WthreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WthreadError::InvalidConfig(msg) => write!(f, "invalid work-thread config: {}", msg),
            WthreadError::Spawn(e) => write!(f, "failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for WthreadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WthreadError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WthreadError {
    fn from(e: std::io::Error) -> Self {
        WthreadError::Spawn(e)
    }
}
