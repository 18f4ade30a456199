//! Errors raised while loading a webstore configuration.

use std::io;
use thiserror::Error;

/// Why a webstore configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read webstore config file {path}: {source}")]
    ReadError {
        /// File that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file (or the embedded defaults) is not valid TOML, or a
    /// value has the wrong type.
    #[error("invalid TOML in webstore config {path}: {source}")]
    ParseError {
        /// File that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration breaks a webstore constraint.
    #[error("webstore config field `{field}` rejected: {message}")]
    ValidationError {
        /// Offending field, or the file path for file-level limits.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_webstore_context() {
        let err = ConfigError::invalid("prefix", "must not be empty");
        assert_eq!(
            err.to_string(),
            "webstore config field `prefix` rejected: must not be empty"
        );

        let err = ConfigError::ReadError {
            path: "/etc/webstore.toml".to_owned(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("cannot read webstore config file /etc/webstore.toml"));
    }
}
