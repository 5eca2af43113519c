//! Error types for rendering sessions

use thiserror::Error;

/// Result type alias for engine and session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while launching, driving or releasing a session
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the browser or open its tab
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to capture or encode the image
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The URL could not be handed to the browser
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The session worker went away before answering
    #[error("Session closed: {0}")]
    SessionClosed(String),
}

impl Error {
    /// Whether this error was caused by a deadline rather than a failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_reported_in_millis() {
        let err = Error::Timeout(30000);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Operation timed out after 30000ms");
    }

    #[test]
    fn load_error_is_not_a_timeout() {
        assert!(!Error::LoadError("net::ERR_NAME_NOT_RESOLVED".into()).is_timeout());
    }
}
