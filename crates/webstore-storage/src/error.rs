//! Storage error types.

use serde::{Deserialize, Serialize};

/// Stable error codes surfaced on the error notification channel.
///
/// The serialized names are part of the public contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A storage operation ran while no provider was active.
    ProviderNotSet,
    /// The requested provider name is not registered.
    UnknownProvider,
    /// A provider with the same name is already registered.
    ProviderExists,
    /// The provider failed its availability or writability probe.
    ProviderInvalid,
    /// A value could not be serialized.
    EncodingFailed,
    /// A stored value could not be deserialized.
    DecodingFailed,
    /// The backing store rejected a write.
    WriteFailed,
}

impl ErrorCode {
    /// The wire name of this code (e.g. `PROVIDER_NOT_SET`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderNotSet => "PROVIDER_NOT_SET",
            Self::UnknownProvider => "UNKNOWN_PROVIDER",
            Self::ProviderExists => "PROVIDER_EXISTS",
            Self::ProviderInvalid => "PROVIDER_INVALID",
            Self::EncodingFailed => "ENCODING_FAILED",
            Self::DecodingFailed => "DECODING_FAILED",
            Self::WriteFailed => "WRITE_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No provider is active.
    #[error("storage provider is not set")]
    ProviderNotSet,

    /// The named provider is not registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The named provider is already registered.
    #[error("provider already exists: {0}")]
    ProviderExists(String),

    /// The host does not expose the provider's backing store.
    #[error("{provider} is not available in this environment")]
    Unavailable {
        /// Provider name.
        provider: String,
    },

    /// The backing store exists but rejected the writability probe.
    #[error("{provider} is not writable: {reason}")]
    NotWritable {
        /// Provider name.
        provider: String,
        /// Why the probe failed.
        reason: String,
    },

    /// Validation for the provider could not be run to completion.
    #[error("activation of {provider} aborted: {reason}")]
    ActivationAborted {
        /// Provider name.
        provider: String,
        /// What stopped the validation.
        reason: String,
    },

    /// A write exceeded the store's quota.
    #[error("quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        used: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// Serialization failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Deserialization failed.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// I/O against a persistent store failed.
    #[error("io error: {0}")]
    Io(String),
}

impl StorageError {
    /// Map this error onto its stable [`ErrorCode`].
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProviderNotSet => ErrorCode::ProviderNotSet,
            Self::UnknownProvider(_) => ErrorCode::UnknownProvider,
            Self::ProviderExists(_) => ErrorCode::ProviderExists,
            Self::Unavailable { .. }
            | Self::NotWritable { .. }
            | Self::ActivationAborted { .. } => ErrorCode::ProviderInvalid,
            Self::Encoding(_) => ErrorCode::EncodingFailed,
            Self::Decoding(_) => ErrorCode::DecodingFailed,
            Self::QuotaExceeded { .. } | Self::Io(_) => ErrorCode::WriteFailed,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
