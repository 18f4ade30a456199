#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the webstore façade.
//!
//! This crate provides [`WebStorageConfig`] (prefix, provider, notification
//! toggles), [`ConfigPatch`] for partial updates, and file loading.
//!
//! # Usage
//!
//! ```rust
//! use webstore_config::{ConfigPatch, WebStorageConfig};
//!
//! let config = WebStorageConfig::default();
//! let config = config.merge(&ConfigPatch::new().prefix("app"));
//! assert_eq!(config.prefix, "app");
//! assert_eq!(config.provider, "localStorage");
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. Runtime patches passed to `setup`
//! 2. The config file (TOML)
//! 3. Environment variables (`WEBSTORE_PREFIX`, `WEBSTORE_PROVIDER`), fallback only
//! 4. Embedded defaults (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other internal webstore crates.

/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl WebStorageConfig {
    /// Load configuration from a TOML file with environment fallbacks.
    ///
    /// See [`loader::load_with_env`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the resulting
    /// configuration fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Load configuration from defaults and environment variables only.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the environment yields an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        loader::load(None)
    }
}
