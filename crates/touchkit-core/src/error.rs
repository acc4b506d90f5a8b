//! Error taxonomy for command execution.
//!
//! Collaborator failures (element provider, touch injection) are reported as
//! [`ProviderError`]. Everything a command can fail with is folded into
//! [`CommandError`], which maps one-to-one onto the
//! [`CommandStatus`](crate::command::CommandStatus) returned to callers.

use thiserror::Error;

use crate::command::CommandStatus;

/// Errors raised by the element provider or the touch injector.
///
/// This enum unifies errors from all collaborator backends behind a single
/// type so the dispatcher can surface them uniformly.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A provider call failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The element handle no longer refers to a live element.
    #[error("Stale element handle: {0}")]
    StaleElement(String),

    /// The element exists but has no on-screen frame.
    #[error("Element has no frame: {0}")]
    MissingFrame(String),

    /// The backend is not available.
    #[error("Not connected to automation backend")]
    NotConnected,

    /// Injection did not complete within the caller-supplied bound.
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that terminate a single command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The query matched no element.
    #[error("No element matches {query}")]
    ElementNotFound {
        /// Display form of the query, e.g. `NAME "Submit"`.
        query: String,
    },

    /// The query matched several elements and narrowing did not single one out.
    #[error("{count} elements match {query}")]
    AmbiguousMatch {
        /// Display form of the query.
        query: String,
        /// Number of candidates left after narrowing.
        count: usize,
    },

    /// Gesture parameters cannot produce a valid gesture.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A collaborator failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl CommandError {
    /// The status code reported for this error.
    pub fn status(&self) -> CommandStatus {
        match self {
            CommandError::ElementNotFound { .. } => CommandStatus::ElementNotFound,
            CommandError::AmbiguousMatch { .. } => CommandStatus::AmbiguousMatch,
            CommandError::InvalidGeometry(_) => CommandStatus::InvalidGeometry,
            CommandError::Provider(_) => CommandStatus::ProviderError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::CommandFailed("inject failed".to_string());
        assert!(err.to_string().contains("inject failed"));

        let err = ProviderError::NotConnected;
        assert!(err.to_string().contains("Not connected"));

        let err = ProviderError::Timeout(250);
        assert!(err.to_string().contains("250ms"));

        let err = ProviderError::StaleElement("g1:0.2".to_string());
        assert!(err.to_string().contains("g1:0.2"));
    }

    #[test]
    fn test_command_error_status_mapping() {
        let err = CommandError::ElementNotFound { query: "ID \"x\"".into() };
        assert_eq!(err.status(), CommandStatus::ElementNotFound);

        let err = CommandError::AmbiguousMatch { query: "NAME \"Submit\"".into(), count: 2 };
        assert_eq!(err.status(), CommandStatus::AmbiguousMatch);
        assert!(err.to_string().starts_with("2 elements"));

        let err = CommandError::InvalidGeometry("zero duration".into());
        assert_eq!(err.status(), CommandStatus::InvalidGeometry);

        let err: CommandError = ProviderError::Timeout(10).into();
        assert_eq!(err.status(), CommandStatus::ProviderError);
        assert!(err.to_string().contains("timed out"));
    }
}
