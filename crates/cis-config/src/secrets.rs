//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES under `client.keys_env`. Secrets are
//! resolved once via [`resolve_secrets`] and handed to constructors; no other
//! code reads the environment. Error messages mention the NAME, never the
//! value, and `Debug` output is redacted.

use anyhow::{bail, Result};

use crate::settings::ClientSettings;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Base64-encoded CIS password exactly as issued. Decoding happens in the
    /// client so a malformed value fails there as a config error.
    pub cis_password_b64: String,
    /// File-transfer username. `None` if the variable is unconfigured or empty.
    pub file_transfer_username: Option<String>,
    /// File-transfer password. `None` if the variable is unconfigured or empty.
    pub file_transfer_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("cis_password_b64", &"<REDACTED>")
            .field(
                "file_transfer_username",
                &self.file_transfer_username.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "file_transfer_password",
                &self.file_transfer_password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve every secret named by `settings`.
///
/// The CIS password is required: every protocol call is signed with it.
/// File-transfer credentials are optional here and enforced at upload time,
/// so a process that only vends never needs them.
pub fn resolve_secrets(settings: &ClientSettings) -> Result<ResolvedSecrets> {
    let names = &settings.client.keys_env;

    let Some(cis_password_b64) = resolve_env(&names.cis_password) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (CIS password) is not set or empty",
            names.cis_password
        );
    };

    Ok(ResolvedSecrets {
        cis_password_b64: cis_password_b64.trim().to_string(),
        file_transfer_username: names.file_transfer_username.as_deref().and_then(resolve_env),
        file_transfer_password: names.file_transfer_password.as_deref().and_then(resolve_env),
    })
}
