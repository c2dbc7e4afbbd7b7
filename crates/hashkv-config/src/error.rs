//! Errors raised while loading hashkv configuration.

use std::path::PathBuf;

/// Why a hashkv configuration could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config layer exists but could not be read.
    #[error("cannot read hashkv config {}: {source}", path.display())]
    Read {
        /// The layer's file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config layer is larger than the loader accepts.
    #[error("hashkv config {} is {size} bytes, limit is {limit}", path.display())]
    TooLarge {
        /// The layer's file.
        path: PathBuf,
        /// Size on disk.
        size: u64,
        /// Accepted maximum.
        limit: u64,
    },

    /// A layer is not valid TOML, or the merged table does not fit the
    /// hashkv schema. `origin` is a file path or a `<...>` label for the
    /// embedded defaults and the merged result.
    #[error("malformed hashkv config in {origin}: {source}")]
    Parse {
        /// Where the bad TOML came from.
        origin: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged config parsed but holds an unusable value.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted key of the offending setting, e.g. `store.namespace`.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = ConfigError::Invalid {
            field: "store.namespace".into(),
            message: "namespace must not be empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid `store.namespace`: namespace must not be empty"
        );

        let err = ConfigError::TooLarge {
            path: PathBuf::from("/etc/hashkv/config.toml"),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "hashkv config /etc/hashkv/config.toml is 2048 bytes, limit is 1024"
        );
    }

    #[test]
    fn test_read_error_keeps_io_source() {
        use std::error::Error as _;

        let err = ConfigError::Read {
            path: PathBuf::from("missing.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot read hashkv config missing.toml: "));
        let io = err.source().and_then(|s| s.downcast_ref::<std::io::Error>());
        assert_eq!(io.map(std::io::Error::kind), Some(std::io::ErrorKind::NotFound));
    }
}
