//! Error types
//!
//! Every fallible operation in the crate reports a single [`Error`]. Structural
//! problems in the document, security refusals and programming mistakes are
//! kept apart so callers can tell a bad input from a bad handler.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error raised by caller code (handler constructors, finalize hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while streaming a document.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed XML. `line` is 1-based, `column` is a 0-based byte offset.
    #[error("{message}: line {line}, column {column}")]
    Syntax {
        message: String,
        line: u64,
        column: u64,
    },

    /// The document attempted entity expansion or external resolution.
    #[error("{0}")]
    Security(String),

    /// The crate was used in a way that can never succeed.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A reader supplied as input failed.
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A handler constructor or finalize hook failed; the source is kept as is.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Wrap a caller error raised inside a handler.
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Handler(error.into())
    }

    pub(crate) fn syntax(message: impl Into<String>, line: u64, column: u64) -> Self {
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Whether the error is a refusal of the security policy.
    pub fn is_security(&self) -> bool {
        matches!(self, Error::Security(_))
    }

    /// Whether the error reports malformed XML.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    /// The usage error, if this is one.
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(e) => Some(e),
            _ => None,
        }
    }
}

/// Programming errors: the same call would fail on any document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// An element's children were requested twice.
    #[error("no handle to use, the node was already handled")]
    AlreadyHandled,

    /// An element's children were requested after the parser moved past them.
    #[error("node handled out of order, the parser has already moved past it")]
    OutOfOrder,

    /// Two handler registrations overlap.
    #[error("{path}: {reason}")]
    ConflictingHandlers { path: String, reason: &'static str },

    /// A read of zero bytes was requested from a stream.
    #[error("invalid read size {0}, streams must be read by a strictly positive size")]
    InvalidReadSize(usize),

    /// An attribute key is not a valid `{namespace}name` form.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// A stateful handler was re-entered while one of its methods was running.
    #[error("handler instance is already in use")]
    HandlerBusy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_display() {
        let err = Error::syntax("No element found", 1, 0);
        assert_eq!(err.to_string(), "No element found: line 1, column 0");
        assert!(err.is_syntax());
        assert!(!err.is_security());
    }

    #[test]
    fn test_security_flag() {
        let err = Error::Security("Entity definition is forbidden".to_string());
        assert!(err.is_security());
        assert_eq!(err.to_string(), "Entity definition is forbidden");
    }

    #[test]
    fn test_usage_conversion() {
        let err: Error = UsageError::AlreadyHandled.into();
        assert_eq!(err.as_usage(), Some(&UsageError::AlreadyHandled));
    }

    #[test]
    fn test_handler_error_kept() {
        let err = Error::handler("constructor failed");
        assert_eq!(err.to_string(), "constructor failed");
    }
}
