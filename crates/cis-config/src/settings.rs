//! Typed view of the merged configuration document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SOAP_PATH: &str = "/superEdge/services/SuperEdgeService";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub client: ClientSection,
    pub cis: CisEndpoint,
    pub file_transfer: FileTransferEndpoint,
    pub reconciliation: ReconciliationSection,
}

impl ClientSettings {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("config does not match client settings")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    /// Vending client id allocated by CIS (e.g. `UT000011`).
    pub app_id: String,
    pub keys_env: KeysEnv,
}

/// Environment variable NAMES holding credentials. Never values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysEnv {
    /// Base64-encoded CIS password.
    pub cis_password: String,
    #[serde(default)]
    pub file_transfer_username: Option<String>,
    #[serde(default)]
    pub file_transfer_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CisEndpoint {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_soap_path")]
    pub path: String,
    /// Accept self-signed backend certificates. Scoped to this client's
    /// transport; nothing process-wide is touched.
    #[serde(default)]
    pub skip_certificate_verification: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CisEndpoint {
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme,
            self.host.trim_end_matches('/'),
            self.port,
            self.path
        )
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_soap_path() -> String {
    DEFAULT_SOAP_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// How reconciliation files leave the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTransferMode {
    /// Store on `host:port` over FTP.
    #[default]
    Ftp,
    /// Write below `staging_root` only; nothing is sent (dry runs).
    Staging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTransferEndpoint {
    #[serde(default)]
    pub mode: FileTransferMode,
    pub host: String,
    pub port: u16,
    /// Local directory standing in for the remote root in staging mode.
    #[serde(default = "default_staging_root")]
    pub staging_root: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_staging_root() -> String {
    "outbox".to_string()
}

/// Deployment profile for the reconciliation pipeline. The two profiles
/// disagree on reference date, file extension and notify default, so one
/// must always be chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationProfile {
    Standard,
    Hardened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceDay {
    Today,
    Yesterday,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSection {
    pub profile: ReconciliationProfile,
    #[serde(default)]
    pub remote_root: Option<String>,
    #[serde(default)]
    pub reference_day: Option<ReferenceDay>,
    /// Empty string means "no extension".
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub notify_after_upload: Option<bool>,
}

/// Fully resolved reconciliation behaviour: profile preset plus overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    pub remote_root: String,
    pub reference_day: ReferenceDay,
    pub file_extension: Option<String>,
    pub notify_after_upload: bool,
}

impl ReconciliationProfile {
    pub fn preset(self) -> ReconciliationPolicy {
        match self {
            ReconciliationProfile::Standard => ReconciliationPolicy {
                remote_root: "Agency".to_string(),
                reference_day: ReferenceDay::Today,
                file_extension: Some(".csv".to_string()),
                notify_after_upload: true,
            },
            ReconciliationProfile::Hardened => ReconciliationPolicy {
                remote_root: "Agency".to_string(),
                reference_day: ReferenceDay::Yesterday,
                file_extension: None,
                notify_after_upload: false,
            },
        }
    }
}

impl ReconciliationSection {
    pub fn resolve(&self) -> ReconciliationPolicy {
        let mut policy = self.profile.preset();
        if let Some(root) = &self.remote_root {
            policy.remote_root = root.trim_end_matches('/').to_string();
        }
        if let Some(day) = self.reference_day {
            policy.reference_day = day;
        }
        if let Some(ext) = &self.file_extension {
            policy.file_extension = if ext.is_empty() {
                None
            } else {
                Some(ext.clone())
            };
        }
        if let Some(notify) = self.notify_after_upload {
            policy.notify_after_upload = notify;
        }
        policy
    }
}
