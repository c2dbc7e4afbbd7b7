//! Storage error types.

/// Underlying error kept as the source of a backend failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from storage operations.
///
/// Backend failures display exactly as the backend reported them and keep
/// the backend's own error as their [`source`](std::error::Error::source),
/// so callers can downcast to it (e.g. `redis::RedisError`). The adapter
/// never rewrites or retries them.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key was not found in the namespace.
    #[error("not found: {0}")]
    NotFound(String),

    /// Dialing, authenticating or checking out a connection failed, or the
    /// connection broke mid-command.
    #[error("{message}")]
    Connection {
        /// Message as reported by the backend.
        message: String,
        /// The backend's original error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// The backing store rejected or failed a command.
    #[error("{message}")]
    Command {
        /// Message as reported by the backend.
        message: String,
        /// The backend's original error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// A reply did not have the expected shape.
    #[error("{message}")]
    Decode {
        /// What was wrong with the reply.
        message: String,
        /// The decoder's original error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization of a typed value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// A connection failure with no underlying error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// A command failure with no underlying error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            source: None,
        }
    }

    /// A decode failure with no underlying error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the backend's original error. Ignored for variants that do not
    /// carry a source.
    #[must_use]
    pub fn with_source(mut self, err: impl Into<BoxError>) -> Self {
        if let Self::Connection { source, .. }
        | Self::Command { source, .. }
        | Self::Decode { source, .. } = &mut self
        {
            *source = Some(err.into());
        }
        self
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_backend_message_displayed_verbatim() {
        let err = StorageError::command("ERR wrong number of arguments");
        assert_eq!(err.to_string(), "ERR wrong number of arguments");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_with_source_is_downcastable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = StorageError::connection(io.to_string()).with_source(io);

        let source = err.source().unwrap();
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "reset by peer");
    }

    #[test]
    fn test_with_source_ignored_for_not_found() {
        let err = StorageError::NotFound("k".into()).with_source(std::fmt::Error);
        assert!(err.source().is_none());
    }
}
