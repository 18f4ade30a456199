//! Webstore Test - Shared test utilities for the webstore crates.
//!
//! Mock collaborators (stores, providers) and fixtures that can be used
//! across webstore crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! webstore-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use webstore_test::{EventRecorder, test_host};
//!
//! #[tokio::test]
//! async fn test_set_is_observed() {
//!     let storage = WebStorage::connect(test_config(), test_host()).await;
//!     let recorder = EventRecorder::attach(storage.events());
//!
//!     storage.set("k", &1);
//!     assert_eq!(recorder.kinds(), vec![EventKind::Set]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
