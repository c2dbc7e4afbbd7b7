//! Config file discovery and layered loading.
//!
//! `Config::load()`:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the user config (`<config dir>/hashkv/config.toml`)
//! 3. Merge the explicit file, if one was given
//! 4. Apply env var fallbacks for fields no file set
//! 5. Resolve `${VAR}` references
//! 6. Deserialize and validate

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, collect_leaf_paths, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus the files that contributed to it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Paths of the files merged on top of the defaults, in order.
    pub loaded_files: Vec<String>,
}

/// Load configuration with layered precedence.
///
/// `explicit` is merged last among files. `config_dir_override` replaces the
/// platform config directory (useful for tests).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the final
/// configuration fails validation.
pub fn load(
    explicit: Option<&Path>,
    config_dir_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, config_dir_override, &collect_env_vars())
}

/// [`load`] with a caller-supplied environment.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    config_dir_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            origin: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut file_set = HashSet::new();
    let mut loaded_files = Vec::new();

    let mut merge_layer = |path: &Path, overlay: toml::Value| {
        collect_leaf_paths(&overlay, "", &mut file_set);
        deep_merge(&mut merged, overlay);
        info!(path = %path.display(), "loaded config");
        loaded_files.push(path.display().to_string());
    };

    // User config is optional; an explicit file must exist.
    let user_path = config_dir_override
        .map(Path::to_path_buf)
        .or_else(user_config_dir)
        .map(|dir| dir.join("config.toml"));
    if let Some(path) = &user_path
        && let Some(overlay) = try_load_file(path)?
    {
        merge_layer(path, overlay);
    }
    if let Some(path) = explicit {
        let overlay = read_file(path)?;
        merge_layer(path, overlay);
    }

    let env_count = apply_env_fallbacks(&mut merged, &file_set, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    resolve_env_references(&mut merged, env_vars);
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                origin: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering, no env fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = read_file(path)?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            origin: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Platform config directory for hashkv, e.g. `~/.config/hashkv`.
fn user_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hashkv").map(|d| d.config_dir().to_path_buf())
}

/// Recursively merge `overlay` into `base`; tables merge, everything else
/// replaces.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_file(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::Read { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let size = content.len() as u64;
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        origin: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendKind, ConnectionMode};

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.store.namespace, "default");
        assert_eq!(config.store.backend, BackendKind::Redis);
        assert_eq!(config.store.redis.mode, ConnectionMode::Pooled);
        assert_eq!(config.store.memory.page_size, 10);
        assert!(validate::validate(&config).is_ok());
    }

    #[test]
    fn test_load_defaults_only() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_with_env(None, Some(dir.path()), &no_env()).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.store.redis.address, "127.0.0.1:6379");
    }

    #[test]
    fn test_explicit_file_overrides_user_file() {
        let user_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            user_dir.path().join("config.toml"),
            "[store]\nnamespace = \"user\"\n[store.redis]\naddress = \"user-host:6379\"\n",
        )
        .unwrap();

        let explicit_dir = tempfile::tempdir().unwrap();
        let explicit = explicit_dir.path().join("hashkv.toml");
        std::fs::write(&explicit, "[store]\nnamespace = \"explicit\"\n").unwrap();

        let resolved = load_with_env(Some(&explicit), Some(user_dir.path()), &no_env()).unwrap();

        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(resolved.config.store.namespace, "explicit");
        assert_eq!(resolved.config.store.redis.address, "user-host:6379");
    }

    #[test]
    fn test_env_fallback_and_references() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("hashkv.toml");
        std::fs::write(
            &explicit,
            "[store]\nnamespace = \"file-ns\"\n[store.redis]\npassword = \"${SECRET}\"\n",
        )
        .unwrap();

        let env: HashMap<String, String> = [
            ("HASHKV_NAMESPACE", "env-ns"),
            ("HASHKV_REDIS_MODE", "direct"),
            ("SECRET", "pw"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let config = load_with_env(Some(&explicit), Some(dir.path()), &env)
            .unwrap()
            .config;

        assert_eq!(config.store.namespace, "file-ns");
        assert_eq!(config.store.redis.mode, ConnectionMode::Direct);
        assert_eq!(config.store.redis.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_with_env(
            Some(Path::new("/nonexistent/hashkv.toml")),
            Some(dir.path()),
            &no_env(),
        );
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[store]\nnamespace = \"\"\n").unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(matches!(
            result,
            Err(ConfigError::TooLarge { size, limit, .. }) if size > limit
        ));
    }

    #[test]
    fn test_deep_merge_keeps_sibling_fields() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
    }
}
