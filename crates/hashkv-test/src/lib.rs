//! Shared test utilities for hashkv crates.
//!
//! Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! hashkv-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use hashkv_test::{scan_page, test_service_instance};
//!
//! let instance = test_service_instance("inst-id");
//! let reply = scan_page(0, &[("inst-id", &instance.to_json())]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod replies;
pub mod server;

pub use fixtures::*;
pub use harness::*;
pub use replies::*;
pub use server::{FAILING_FIELD, FakeRedisServer};
