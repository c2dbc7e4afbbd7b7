#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for hashkv stores.
//!
//! A single [`Config`] holds the store namespace, the backend selection
//! (Redis or in-memory), Redis connection policy, and logging settings.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hashkv_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("namespace: {}", resolved.config.store.namespace);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed to [`Config::load`]
//! 2. **User** (`<config dir>/hashkv/config.toml`)
//! 3. **Environment variables** (`HASHKV_*`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! String values may reference environment variables as `${VAR}`.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
