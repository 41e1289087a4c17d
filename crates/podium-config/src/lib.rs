//! podium-config
//!
//! Layered JSON configuration for the reconciliation core.
//!
//! - Typed [`CoreConfig`] with serde defaults, loadable from one file or a
//!   layered merge (later files override earlier, object-wise deep merge).
//! - Canonical (sorted-key, compact) SHA-256 hash of the effective config for
//!   run identification: two configs with the same semantics hash equal
//!   regardless of key order or formatting.
//! - Config files store env var NAMES for credentials, never values; see
//!   [`secrets`].

pub mod secrets;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Typed sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory scanned for `<teamId>_results.json` files.
    pub directory: PathBuf,
    /// File-watch coalescing window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            debounce_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub enabled: bool,
    pub server_url: String,
    pub api_endpoint: String,
    /// Response adapter: "bare-array" | "teams-object" | "platform-rows".
    pub source_kind: String,
    /// Env var NAME holding the bearer token (value resolved at startup).
    pub api_key_env: String,
    /// Env var NAMEs for basic-credential auth.
    pub username_env: String,
    pub password_env: String,
    pub headers: BTreeMap<String, String>,
    pub heartbeat_interval_ms: u64,
    pub real_time: bool,
    pub auto_reconnect: bool,
    pub max_retries: u32,
    pub retry_interval_secs: u64,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: "http://localhost:8080".to_string(),
            api_endpoint: "/api/teams".to_string(),
            source_kind: "bare-array".to_string(),
            api_key_env: "PODIUM_API_KEY".to_string(),
            username_env: "PODIUM_API_USER".to_string(),
            password_env: "PODIUM_API_PASS".to_string(),
            headers: BTreeMap::new(),
            heartbeat_interval_ms: 5000,
            real_time: true,
            auto_reconnect: true,
            max_retries: 3,
            retry_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    /// "local" | "remote" | "hybrid".
    pub mode: String,
    pub auto_refresh_interval_secs: u64,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            mode: "local".to_string(),
            auto_refresh_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// JSONL audit file; in-memory only when absent.
    pub log_path: Option<PathBuf>,
    pub hash_chain: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data: DataSection,
    pub network: NetworkSection,
    pub reconcile: ReconcileSection,
    pub audit: AuditSection,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a single JSON config file into [`CoreConfig`].
pub fn load_config(path: impl AsRef<Path>) -> Result<CoreConfig> {
    let raw = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config {:?}", path.as_ref()))?;
    let cfg: CoreConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parse config {:?}", path.as_ref()))?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Load and deep-merge config files in order (later overrides earlier),
/// returning the typed config plus the effective canonical hash.
pub fn load_layered(paths: &[impl AsRef<Path>]) -> Result<(CoreConfig, String)> {
    let mut merged = Value::Object(serde_json::Map::new());
    for p in paths {
        let raw = std::fs::read_to_string(p.as_ref())
            .with_context(|| format!("read config {:?}", p.as_ref()))?;
        let layer: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {:?}", p.as_ref()))?;
        deep_merge(&mut merged, layer);
    }
    let hash = effective_hash(&merged)?;
    let cfg: CoreConfig =
        serde_json::from_value(merged).context("merged config does not fit schema")?;
    validate(&cfg)?;
    Ok((cfg, hash))
}

fn validate(cfg: &CoreConfig) -> Result<()> {
    match cfg.reconcile.mode.as_str() {
        "local" | "remote" | "hybrid" => {}
        other => bail!("invalid reconcile.mode '{other}'; expected local | remote | hybrid"),
    }
    match cfg.network.source_kind.as_str() {
        "bare-array" | "teams-object" | "platform-rows" => {}
        other => bail!(
            "invalid network.source_kind '{other}'; \
             expected bare-array | teams-object | platform-rows"
        ),
    }
    if cfg.network.enabled && cfg.network.server_url.trim().is_empty() {
        bail!("network.enabled is true but network.server_url is empty");
    }
    Ok(())
}

/// Object-wise deep merge: objects merge recursively, everything else is
/// replaced by the overriding layer.
pub fn deep_merge(base: &mut Value, over: Value) {
    match (base, over) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (k, v) in over_map {
                match base_map.get_mut(&k) {
                    Some(slot) => deep_merge(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, over) => *slot = over,
    }
}

// ---------------------------------------------------------------------------
// Canonical hash
// ---------------------------------------------------------------------------

/// Lowercase-hex SHA-256 over the sorted-key compact rendering of `v`.
pub fn effective_hash(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    let canonical = serde_json::to_string(&sorted).context("canonicalize config")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.data.directory, PathBuf::from("data"));
        assert_eq!(cfg.data.debounce_ms, 1000);
        assert_eq!(cfg.network.max_retries, 3);
        assert_eq!(cfg.reconcile.mode, "local");
        validate(&cfg).unwrap();
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.json");
        std::fs::write(
            &path,
            r#"{ "reconcile": { "mode": "hybrid" }, "data": { "directory": "/contest/data" } }"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.reconcile.mode, "hybrid");
        assert_eq!(cfg.data.directory, PathBuf::from("/contest/data"));
        // Untouched sections keep defaults.
        assert_eq!(cfg.network.retry_interval_secs, 5);
    }

    #[test]
    fn invalid_mode_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.json");
        std::fs::write(&path, r#"{ "reconcile": { "mode": "both" } }"#).unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn invalid_source_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.json");
        std::fs::write(&path, r#"{ "network": { "source_kind": "xml" } }"#).unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn layered_merge_later_overrides_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        let env = dir.path().join("env.json");
        std::fs::write(
            &base,
            r#"{ "network": { "server_url": "http://base", "max_retries": 2 } }"#,
        )
        .unwrap();
        std::fs::write(&env, r#"{ "network": { "server_url": "http://env" } }"#).unwrap();

        let (cfg, hash) = load_layered(&[&base, &env]).unwrap();
        assert_eq!(cfg.network.server_url, "http://env");
        // Sibling key from the base layer survives the merge.
        assert_eq!(cfg.network.max_retries, 2);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn effective_hash_is_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{ "b": 1, "a": { "y": 2, "x": 3 } }"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "a": { "x": 3, "y": 2 }, "b": 1 }"#).unwrap();
        assert_eq!(effective_hash(&a).unwrap(), effective_hash(&b).unwrap());
    }

    #[test]
    fn effective_hash_changes_with_content() {
        let a: Value = serde_json::from_str(r#"{ "retries": 3 }"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "retries": 4 }"#).unwrap();
        assert_ne!(effective_hash(&a).unwrap(), effective_hash(&b).unwrap());
    }
}
