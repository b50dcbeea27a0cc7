//! Error taxonomy.
//!
//! Internally every failure is a [`CisError`] so the right status and message
//! can be picked. Everything crossing the public API is a [`DomainError`].

use thiserror::Error;

use crate::transport::TransportError;

/// Message used when the backend or transport gives nothing better.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Message used when the transport succeeded but returned no body.
pub const EMPTY_RESPONSE_MESSAGE: &str = "Request failed. Please try again";

/// Prefix for file-transfer failures.
pub const UPLOAD_FAILURE_MESSAGE: &str = "Failed to upload reconciliation file";

/// Status used whenever no numeric status can be derived.
pub const FALLBACK_STATUS: u32 = 500;

#[derive(Debug, Error)]
pub enum CisError {
    /// Malformed stored credential or missing configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A request body could not be rendered as XML.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered with a non-success `returnCode`.
    #[error("cis rejected request: returnCode={return_code} message={message:?}")]
    Rejected {
        return_code: String,
        message: Option<String>,
    },

    /// The response could not be parsed or lacked the expected structure.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport succeeded but the body was empty.
    #[error("empty response body")]
    EmptyResponse,

    /// The reconciliation file never reached the file-transfer server.
    #[error("reconciliation upload failed: {0}")]
    Upload(TransportError),
}

impl CisError {
    pub fn status(&self) -> u32 {
        match self {
            CisError::Rejected { return_code, .. } => return_code
                .trim()
                .parse::<u32>()
                .unwrap_or(FALLBACK_STATUS),
            CisError::Transport(TransportError::Status { status, .. })
            | CisError::Upload(TransportError::Status { status, .. }) => u32::from(*status),
            _ => FALLBACK_STATUS,
        }
    }

    /// Caller-facing message. Backend messages pass through verbatim.
    pub fn public_message(&self) -> String {
        match self {
            CisError::Config(msg) | CisError::Serialization(msg) | CisError::Malformed(msg) => {
                msg.clone()
            }
            CisError::Transport(TransportError::Status { .. }) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            CisError::Transport(other) => other.to_string(),
            CisError::Rejected { message, .. } => message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
            CisError::EmptyResponse => EMPTY_RESPONSE_MESSAGE.to_string(),
            CisError::Upload(inner) => format!("{UPLOAD_FAILURE_MESSAGE}: {inner}"),
        }
    }
}

/// The one error shape callers see.
#[derive(Debug, Error)]
#[error("{message} (status {status})")]
pub struct DomainError {
    pub message: String,
    pub status: u32,
    #[source]
    pub cause: Option<CisError>,
}

impl DomainError {
    pub fn new(message: impl Into<String>, status: u32) -> Self {
        Self {
            message: message.into(),
            status,
            cause: None,
        }
    }
}

impl From<CisError> for DomainError {
    fn from(err: CisError) -> Self {
        Self {
            message: err.public_message(),
            status: err.status(),
            cause: Some(err),
        }
    }
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        CisError::from(err).into()
    }
}
