//! Request signing.
//!
//! signature = lowercase hex MD5 of `appId + serviceCode + secret + <data>…</data>`
//! where the last part is the compact XML of the request body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};

use crate::error::CisError;

/// The decoded CIS password. Decoded once when the client is built.
#[derive(Clone)]
pub struct Credential {
    secret: String,
}

impl Credential {
    pub fn decode(stored_b64: &str) -> Result<Self, CisError> {
        let bytes = STANDARD
            .decode(stored_b64.trim())
            .map_err(|e| CisError::Config(format!("cis password is not valid base64: {e}")))?;
        let secret = String::from_utf8(bytes)
            .map_err(|_| CisError::Config("decoded cis password is not utf-8".to_string()))?;
        Ok(Self { secret })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<REDACTED>)")
    }
}

pub fn sign(
    app_id: &str,
    service_code: &str,
    credential: &Credential,
    canonical_body_xml: &str,
) -> String {
    let mut hasher = Md5::new();
    hasher.update(app_id.as_bytes());
    hasher.update(service_code.as_bytes());
    hasher.update(credential.secret.as_bytes());
    hasher.update(canonical_body_xml.as_bytes());
    format!("{:x}", hasher.finalize())
}
