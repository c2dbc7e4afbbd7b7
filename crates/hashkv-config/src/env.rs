//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use tracing::debug;

/// Environment variable name → config field path.
const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("HASHKV_NAMESPACE", "store.namespace"),
    ("HASHKV_BACKEND", "store.backend"),
    ("HASHKV_REDIS_ADDRESS", "store.redis.address"),
    ("HASHKV_REDIS_PASSWORD", "store.redis.password"),
    ("HASHKV_REDIS_MODE", "store.redis.mode"),
    ("HASHKV_REDIS_POOL_MAX_SIZE", "store.redis.pool.max_size"),
    ("HASHKV_LOG_LEVEL", "logging.level"),
    ("HASHKV_LOG_FORMAT", "logging.format"),
];

/// Fields parsed as integers when they come from the environment.
const INTEGER_FIELDS: &[&str] = &[
    "store.redis.pool.max_size",
    "store.redis.pool.wait_timeout_ms",
    "store.memory.page_size",
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Record every leaf path present in `val` (e.g. `store.redis.address`).
pub fn collect_leaf_paths(val: &toml::Value, prefix: &str, out: &mut HashSet<String>) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_leaf_paths(child, &path, out);
        }
    } else {
        out.insert(prefix.to_owned());
    }
}

/// Apply environment variable fallbacks to fields that no file layer set.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    file_set: &HashSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for (var_name, field_path) in ENV_MAPPINGS {
        if file_set.contains(*field_path) {
            continue;
        }
        if let Some(val) = env_vars.get(*var_name) {
            debug!(var = var_name, field = field_path, "applying env var fallback");
            set_field_from_string(merged, field_path, val);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            // Unterminated, keep verbatim.
            result.push_str(after);
            return result;
        };
        let var_name = &after[2..end];
        match env_vars.get(var_name) {
            Some(val) if !var_name.is_empty() => result.push_str(val),
            _ => {
                debug!(var = var_name, "unresolved env var reference in config");
                let _ = write!(result, "${{{var_name}}}");
            },
        }
        rest = &after[end.saturating_add(1)..];
    }

    result.push_str(rest);
    result
}

/// Set a dotted field path in the TOML tree from a string value, creating
/// intermediate tables as needed.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let value = if INTEGER_FIELDS.contains(&path)
        && let Ok(i) = val.parse::<i64>()
    {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(val.to_owned())
    };

    let (parents, leaf) = path.rsplit_once('.').unwrap_or(("", path));

    let mut current = root;
    for segment in parents.split('.').filter(|s| !s.is_empty()) {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_resolve_string_refs() {
        let vars = env(&[("PW", "hunter2")]);
        assert_eq!(resolve_string_refs("${PW}", &vars), "hunter2");
        assert_eq!(resolve_string_refs("a-${PW}-b", &vars), "a-hunter2-b");
        assert_eq!(resolve_string_refs("${MISSING}", &vars), "${MISSING}");
        assert_eq!(resolve_string_refs("${PW", &vars), "${PW");
        assert_eq!(resolve_string_refs("plain", &vars), "plain");
    }

    #[test]
    fn test_env_fallback_skips_file_set_fields() {
        let mut merged: toml::Value =
            toml::from_str("[store]\nnamespace = \"from-file\"\n").unwrap();
        let mut file_set = HashSet::new();
        collect_leaf_paths(&merged, "", &mut file_set);

        let vars = env(&[
            ("HASHKV_NAMESPACE", "from-env"),
            ("HASHKV_REDIS_ADDRESS", "redis.internal:6380"),
            ("HASHKV_REDIS_POOL_MAX_SIZE", "4"),
        ]);
        let applied = apply_env_fallbacks(&mut merged, &file_set, &vars);

        assert_eq!(applied, 2);
        assert_eq!(merged["store"]["namespace"].as_str(), Some("from-file"));
        assert_eq!(
            merged["store"]["redis"]["address"].as_str(),
            Some("redis.internal:6380")
        );
        assert_eq!(merged["store"]["redis"]["pool"]["max_size"].as_integer(), Some(4));
    }

    #[test]
    fn test_resolve_env_references_in_tree() {
        let mut val: toml::Value =
            toml::from_str("[store.redis]\npassword = \"${REDIS_PW}\"\n").unwrap();
        resolve_env_references(&mut val, &env(&[("REDIS_PW", "pw")]));
        assert_eq!(val["store"]["redis"]["password"].as_str(), Some("pw"));
    }
}
