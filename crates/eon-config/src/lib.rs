//! eon-config
//!
//! Operator-facing configuration for the reconciliation pipeline:
//! - network resolution from the execution context (`network`)
//! - layered YAML settings with a canonical SHA-256 hash
//! - literal-secret guard and unused-key lint over the merged settings
//! - the shared `ConfigError` taxonomy

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

mod error;
pub mod network;
mod settings;

pub use error::ConfigError;
pub use network::{
    fork_target, fork_target_with, forking_network, resolve_network, ExecutionContext, ForkTarget,
    MiningMode, NetworkName, ENV_FORKING_NETWORK, SECONDS_PER_YEAR,
};
pub use settings::{
    ComptrollerSettings, NetworkSettings, OracleSettings, PolicySettings, Settings,
    DEFAULT_COLLATERAL_SUPPLY_FLOOR, DEFAULT_ORACLE_CONTRACT, DEFAULT_ORACLE_DEPLOY_NAME,
};

/// Literal prefixes that never belong in a settings file. Deployer keys and
/// RPC credentials are injected through the environment.
const SECRET_PREFIXES: &[&str] = &["-----BEGIN", "xprv", "tprv"];

/// JSON-pointer prefixes read by the pipeline. Any merged leaf outside these
/// is reported as unused.
const CONSUMED_POINTERS: &[&str] = &[
    "/policy/collateral_supply_floor",
    "/oracle/name",
    "/oracle/contract",
    "/oracle/target_currency",
    "/comptroller/close_factor",
    "/comptroller/liquidation_incentive",
    "/networks",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report merged settings leaves no stage reads.
/// With `UnusedKeyPolicy::Fail` a non-clean report is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| leaf != "/")
        .filter(|leaf| !CONSUMED_POINTERS.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused settings key(s) detected: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers
        );
    }

    Ok(report)
}

/// `"/a/b"` covers `"/a/b"` and `"/a/b/c"` but not `"/a/bc"`.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json::Map is BTreeMap-backed here, so keys serialize sorted.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
    }
    Ok(())
}

/// Private keys are 32 bytes of hex, optionally `0x`-prefixed. Addresses
/// (20 bytes) do not match.
fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if SECRET_PREFIXES.iter().any(|p| t.starts_with(p)) {
        return true;
    }
    let body = t.strip_prefix("0x").unwrap_or(t);
    body.len() == 64 && body.chars().all(|c| c.is_ascii_hexdigit())
}
