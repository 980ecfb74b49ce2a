//! Modular configuration loader for the graph store.
//!
//! Reads two files from a config directory:
//! - `graph.json` - provider tag, provider config, vector index settings
//! - `secrets.json` - credentials, merged into `graph.json`'s `config` object
//!
//! String values may reference environment variables as `${NAME}`. The
//! result is the raw JSON handed to the store's config validation; nothing
//! here knows which fields a provider requires.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Main store configuration file.
pub const GRAPH_CONFIG_FILE: &str = "graph.json";

/// Optional credentials file.
pub const SECRETS_FILE: &str = "secrets.json";

/// Load a JSON file and return its contents.
/// Returns None if the file doesn't exist.
fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
pub fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => merge_json(target_value, source_value),
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

#[derive(Debug)]
struct UnsetVariable;

impl fmt::Display for UnsetVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not set")
    }
}

/// Expand `${NAME}` references in every string leaf.
fn expand_env<F>(value: &mut Value, path: &str, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) if s.contains("${") => {
            let expanded = shellexpand::env_with_context(s.as_str(), |name| {
                lookup(name).map(Some).ok_or(UnsetVariable)
            })
            .map_err(|e| {
                anyhow::anyhow!("{path}: environment variable `{}` is {}", e.var_name, e.cause)
            })?;
            *s = expanded.into_owned();
        }
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                expand_env(child, &child_path, lookup)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                expand_env(child, &format!("{path}[{i}]"), lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Load the store configuration from `dir`, expanding against the process
/// environment.
pub fn load_store_config(dir: &Path) -> Result<Value> {
    load_store_config_with(dir, |name| std::env::var(name).ok())
}

/// Load the store configuration from `dir` with a custom variable lookup.
///
/// Priority (lowest to highest):
/// 1. `graph.json`
/// 2. `secrets.json`, merged into the `config` object
/// 3. `${NAME}` expansion
pub fn load_store_config_with<F>(dir: &Path, lookup: F) -> Result<Value>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = dir.join(GRAPH_CONFIG_FILE);
    let Some(mut config) = load_json_file(&config_path)? else {
        bail!("Graph store config not found at {}", config_path.display());
    };

    if !config.is_object() {
        bail!("{} must contain a JSON object", config_path.display());
    }

    tracing::debug!("Loading graph store config from {}", dir.display());

    if let Some(secrets) = load_json_file(&dir.join(SECRETS_FILE))? {
        if !secrets.is_object() {
            bail!("{SECRETS_FILE} must contain a JSON object");
        }
        if let Some(config_obj) = config.as_object_mut() {
            let provider_config = config_obj
                .entry("config")
                .or_insert(Value::Object(Default::default()));
            merge_json(provider_config, secrets);
        }
        tracing::debug!("Merged {SECRETS_FILE}");
    }

    expand_env(&mut config, "", &lookup)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: Value) {
        fs::write(dir.path().join(name), value.to_string()).unwrap();
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn merge_json_objects() {
        let mut target = json!({
            "a": 1,
            "b": { "x": 10, "y": 20 }
        });
        let source = json!({
            "b": { "y": 25, "z": 30 },
            "c": 3
        });

        merge_json(&mut target, source);

        assert_eq!(target["a"], 1);
        assert_eq!(target["b"]["x"], 10);
        assert_eq!(target["b"]["y"], 25);
        assert_eq!(target["b"]["z"], 30);
        assert_eq!(target["c"], 3);
    }

    #[test]
    fn merge_json_overwrites_non_objects() {
        let mut target = json!({ "a": [1, 2, 3] });
        merge_json(&mut target, json!({ "a": [4, 5] }));
        assert_eq!(target["a"], json!([4, 5]));
    }

    #[test]
    fn missing_graph_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_store_config_with(dir.path(), no_env).unwrap_err();
        assert!(err.to_string().contains("graph.json"));
    }

    #[test]
    fn secrets_merge_into_provider_config() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            GRAPH_CONFIG_FILE,
            json!({
                "provider": "neo4j",
                "config": { "url": "http://localhost:7474", "username": "placeholder" }
            }),
        );
        write(&dir, SECRETS_FILE, json!({ "username": "neo4j", "password": "pw" }));

        let config = load_store_config_with(dir.path(), no_env).unwrap();
        assert_eq!(config["provider"], "neo4j");
        assert_eq!(config["config"]["url"], "http://localhost:7474");
        assert_eq!(config["config"]["username"], "neo4j");
        assert_eq!(config["config"]["password"], "pw");
    }

    #[test]
    fn secrets_create_config_object_when_absent() {
        let dir = TempDir::new().unwrap();
        write(&dir, GRAPH_CONFIG_FILE, json!({ "provider": "falkordb" }));
        write(&dir, SECRETS_FILE, json!({ "password": "pw" }));

        let config = load_store_config_with(dir.path(), no_env).unwrap();
        assert_eq!(config["config"]["password"], "pw");
    }

    #[test]
    fn env_references_are_expanded() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            GRAPH_CONFIG_FILE,
            json!({
                "provider": "falkordb",
                "config": { "host": "${GRAPH_HOST}", "port": 6379, "tags": ["${GRAPH_HOST}-a"] }
            }),
        );

        let config = load_store_config_with(dir.path(), |name| {
            (name == "GRAPH_HOST").then(|| "graph.internal".to_string())
        })
        .unwrap();
        assert_eq!(config["config"]["host"], "graph.internal");
        assert_eq!(config["config"]["port"], 6379);
        assert_eq!(config["config"]["tags"][0], "graph.internal-a");
    }

    #[test]
    fn unset_env_reference_names_the_field() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            GRAPH_CONFIG_FILE,
            json!({ "provider": "neo4j", "config": { "password": "${NEO4J_PASSWORD}" } }),
        );

        let err = load_store_config_with(dir.path(), no_env).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("config.password"));
        assert!(msg.contains("NEO4J_PASSWORD"));
    }

    #[test]
    fn non_object_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, GRAPH_CONFIG_FILE, json!(["not", "an", "object"]));
        assert!(load_store_config_with(dir.path(), no_env).is_err());
    }
}
