//! cis-config
//!
//! Layered YAML configuration for the CIS vending client.
//!
//! Documents are merged in order (base -> environment -> local overrides),
//! checked for literal secrets, hashed, and then decoded into typed
//! [`ClientSettings`]. Credentials never live in YAML: the config stores the
//! **names** of environment variables and [`resolve_secrets`] reads them once.

mod secrets;
mod settings;

pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use settings::{
    CisEndpoint, ClientSection, ClientSettings, FileTransferEndpoint, FileTransferMode, KeysEnv,
    ReconciliationPolicy, ReconciliationProfile, ReconciliationSection, ReferenceDay,
    DEFAULT_SOAP_PATH,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// Prefixes that only ever appear at the start of real credentials. A leaf
/// string starting with one of these aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "ssh-rsa ",   // SSH public/private key material
    "ssh-ed25519 ",
    "sk_live",
    "sk_test",
    "AKIA", // AWS access key ID
    "ghp_", // GitHub PAT
    "glpat-",
];

/// JSON-pointer leaves the client actually reads. Anything else in the merged
/// document is reported by [`report_unused_keys`].
const CONSUMED_POINTERS: &[&str] = &[
    "/client/app_id",
    "/client/keys_env/cis_password",
    "/client/keys_env/file_transfer_username",
    "/client/keys_env/file_transfer_password",
    "/cis/scheme",
    "/cis/host",
    "/cis/port",
    "/cis/path",
    "/cis/skip_certificate_verification",
    "/cis/timeout_secs",
    "/file_transfer/mode",
    "/file_transfer/host",
    "/file_transfer/port",
    "/file_transfer/staging_root",
    "/file_transfer/timeout_secs",
    "/reconciliation/profile",
    "/reconciliation/remote_root",
    "/reconciliation/reference_day",
    "/reconciliation/file_extension",
    "/reconciliation/notify_after_upload",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Settings plus the secrets they name, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub settings: ClientSettings,
    pub secrets: ResolvedSecrets,
    pub config_hash: String,
}

impl ClientConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let settings = ClientSettings::from_json(&loaded.config_json)?;
        let secrets = resolve_secrets(&settings)?;
        Ok(Self {
            settings,
            secrets,
            config_hash: loaded.config_hash.clone(),
        })
    }
}

/// Load, merge and resolve a full client configuration from YAML paths.
pub fn load_client_config(paths: &[&str]) -> Result<ClientConfig> {
    let loaded = load_layered_yaml(paths)?;
    ClientConfig::from_loaded(&loaded)
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
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Leaf pointers present in the config but never read (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report config leaves the client does not read. With `Fail`, a non-clean
/// report is an error so typos (`notify_afer_upload`) cannot silently fall
/// back to profile defaults.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<&str> = CONSUMED_POINTERS.iter().copied().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
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

/// Compact JSON with keys sorted recursively, so the hash does not depend on
/// which layer introduced a key first.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sort_keys(v)).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
