use std::path::PathBuf;

use thiserror::Error;

// Every variant's Display string is the message shown to the user.
#[derive(Debug, Error)]
pub enum ContextError {
    // Missing or malformed command arguments
    #[error("{0}")]
    Validation(String),

    #[error("Context '{0}' not found.")]
    NotFound(String),

    #[error("No contexts defined.")]
    NoContextsDefined,

    // `context none` while nothing is active
    #[error("Context not unset.")]
    NotUnset,

    // The user answered no (or stdin was closed) at a prompt
    #[error("{0}")]
    ConfirmationDeclined(String),

    // Filter text that the filter grammar rejects
    #[error("parse error: {0}")]
    Parse(String),

    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Task data file that is not valid JSON
    #[error("invalid task data in '{}': {source}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ContextError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContextError::Io {
            path: path.into(),
            source,
        }
    }
}

// Type alias for results that use `ContextError` as the error type
pub type Result<T> = std::result::Result<T, ContextError>;
