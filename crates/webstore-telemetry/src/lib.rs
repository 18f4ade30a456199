//! Logging setup for the webstore façade.
//!
//! The façade itself only emits `tracing` events; binaries and tests that
//! want to see them install a subscriber through this crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use webstore_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), webstore_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("webstore_events=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
