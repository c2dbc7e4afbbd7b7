//! Logging setup for hashkv stores.
//!
//! Store operations emit `tracing` spans and events; this crate installs a
//! subscriber that filters and formats them.
//!
//! # Example
//!
//! ```rust,no_run
//! use hashkv_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), hashkv_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("hashkv_storage=debug");
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
