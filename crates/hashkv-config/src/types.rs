//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store namespace and backend selection.
    pub store: StoreSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Which hash backend a store talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process buckets; nothing survives a restart.
    Memory,
    /// A Redis server.
    #[default]
    Redis,
}

/// How Redis connections are obtained per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Dial and authenticate for every operation, close afterwards.
    Direct,
    /// Check connections out of a pool.
    #[default]
    Pooled,
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Namespace (hash bucket) every operation is scoped to.
    pub namespace: String,
    /// Backend technology.
    pub backend: BackendKind,
    /// Redis settings, used when `backend = "redis"`.
    pub redis: RedisSection,
    /// In-memory settings, used when `backend = "memory"`.
    pub memory: MemorySection,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            namespace: "default".to_owned(),
            backend: BackendKind::default(),
            redis: RedisSection::default(),
            memory: MemorySection::default(),
        }
    }
}

/// Redis endpoint and connection policy.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RedisSection {
    /// `host:port` or a `redis://` / `rediss://` URL.
    pub address: String,
    /// Password sent with `AUTH`. Prefer `HASHKV_REDIS_PASSWORD` or a
    /// `${VAR}` reference over storing it in a file.
    pub password: Option<String>,
    /// Direct dialing or pooled connections.
    pub mode: ConnectionMode,
    /// Pool sizing, used when `mode = "pooled"`.
    pub pool: PoolSection,
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_owned(),
            password: None,
            mode: ConnectionMode::default(),
            pool: PoolSection::default(),
        }
    }
}

impl std::fmt::Debug for RedisSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSection")
            .field("address", &self.address)
            .field("has_password", &self.password.is_some())
            .field("mode", &self.mode)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Serialize for RedisSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RedisSection", 3)?;
        state.serialize_field("address", &self.address)?;
        state.serialize_field("mode", &self.mode)?;
        state.serialize_field("pool", &self.pool)?;
        state.end()
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Maximum number of pooled connections.
    pub max_size: usize,
    /// How long a checkout waits for a free connection. `None` waits forever.
    pub wait_timeout_ms: Option<u64>,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            max_size: 16,
            wait_timeout_ms: Some(5000),
        }
    }
}

/// In-memory backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// Fields examined per scan page.
    pub page_size: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["hashkv_storage=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_section_debug_redacts_password() {
        let section = RedisSection {
            password: Some("s3cret".to_owned()),
            ..RedisSection::default()
        };
        let debug_str = format!("{section:?}");
        assert!(!debug_str.contains("s3cret"));
        assert!(debug_str.contains("has_password: true"));
    }

    #[test]
    fn test_redis_section_serialize_omits_password() {
        let section = RedisSection {
            password: Some("s3cret".to_owned()),
            ..RedisSection::default()
        };
        let json = serde_json::to_string(&section).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"mode\":\"pooled\""));
    }

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[store]\n[store.redis]\n").unwrap();
        assert_eq!(config.store.namespace, "default");
        assert_eq!(config.store.backend, BackendKind::Redis);
        assert_eq!(config.store.redis.pool.max_size, 16);
        assert_eq!(config.logging.level, "info");
    }
}
