//! Error types for the polling loop.

use labwatch_browser::BrowserError;
use thiserror::Error;

/// Errors that end a polling run.
///
/// Every variant is fatal: the loop never retries after an automation fault.
#[derive(Debug, Error)]
pub enum PollError {
    /// The browser could not navigate, find an element or capture the page
    #[error("browser automation failed: {0}")]
    Browser(#[from] BrowserError),

    /// The evidence capture could not be persisted
    #[error("failed to write evidence to {path}: {source}")]
    Evidence {
        /// Destination that could not be written
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A shutdown signal stopped the loop before a final result
    #[error("polling interrupted before a final result")]
    Interrupted,

    /// The loop reached its terminal state without having made an attempt
    #[error("poll loop finished without any attempt")]
    NoAttempt,
}

/// Result type alias using `PollError`.
pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_error_converts() {
        let err: PollError = BrowserError::SelectorNotFound("#covMessage".to_string()).into();
        assert!(matches!(err, PollError::Browser(_)));
        assert_eq!(
            err.to_string(),
            "browser automation failed: selector not found: #covMessage"
        );
    }

    #[test]
    fn test_evidence_error_names_path() {
        let err = PollError::Evidence {
            path: "result.png".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("result.png"));
    }
}
