//! Dispatch: one signed SOAP round trip, or one file upload.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::envelope::RequestDraft;
use crate::error::CisError;
use crate::ids;
use crate::response::unwrap_response;
use crate::signer::Credential;
use crate::transport::{FileTransport, HttpTransport, TransferSession, TransportError};

/// Everything a [`Requester`] needs besides its transports.
#[derive(Clone)]
pub struct RequesterSettings {
    pub app_id: String,
    /// Base64 CIS password as issued.
    pub cis_password_b64: String,
    /// Full SOAP endpoint URL.
    pub endpoint_url: String,
    pub transfer_host: String,
    pub transfer_port: u16,
    pub transfer_username: Option<String>,
    pub transfer_password: Option<String>,
}

impl std::fmt::Debug for RequesterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequesterSettings")
            .field("app_id", &self.app_id)
            .field("cis_password_b64", &"<REDACTED>")
            .field("endpoint_url", &self.endpoint_url)
            .field("transfer_host", &self.transfer_host)
            .field("transfer_port", &self.transfer_port)
            .finish_non_exhaustive()
    }
}

pub struct Requester {
    app_id: String,
    endpoint_url: String,
    credential: Credential,
    session: Option<TransferSession>,
    http: Arc<dyn HttpTransport>,
    files: Arc<dyn FileTransport>,
}

impl Requester {
    /// Fails with a config error if the stored password is not valid base64.
    pub fn new(
        settings: RequesterSettings,
        http: Arc<dyn HttpTransport>,
        files: Arc<dyn FileTransport>,
    ) -> Result<Self, CisError> {
        let credential = Credential::decode(&settings.cis_password_b64)?;
        let session = match (settings.transfer_username, settings.transfer_password) {
            (Some(username), Some(password)) => Some(TransferSession {
                host: settings.transfer_host,
                port: settings.transfer_port,
                username,
                password,
            }),
            _ => None,
        };
        Ok(Self {
            app_id: settings.app_id,
            endpoint_url: settings.endpoint_url,
            credential,
            session,
            http,
            files,
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Sign, wrap, post and unwrap. Returns the response `data` payload.
    pub async fn send_api_request(&self, draft: RequestDraft) -> Result<Option<Value>, CisError> {
        let operation = draft.operation();
        let envelope = draft
            .sign(&self.app_id, &self.credential, ids::message_id())?
            .wrap()?;
        let msg_id = envelope.header().msg_id.clone();

        debug!(%operation, %msg_id, bytes = envelope.soap().len(), "sending cis request");
        let raw = self
            .http
            .send(envelope.into_http_request(&self.endpoint_url))
            .await?;
        if raw.status >= 400 {
            return Err(TransportError::Status {
                status: raw.status,
                body: raw.body,
            }
            .into());
        }

        let data = unwrap_response(&raw.body)?;
        info!(%operation, %msg_id, has_data = data.is_some(), "cis request completed");
        Ok(data)
    }

    pub async fn upload_reconciliation_file(
        &self,
        content: Vec<u8>,
        remote_path: &str,
    ) -> Result<(), CisError> {
        let session = self.session.as_ref().ok_or_else(|| {
            CisError::Config("file-transfer username/password are not configured".to_string())
        })?;
        let bytes = content.len();
        self.files
            .upload(session, content, remote_path)
            .await
            .map_err(CisError::Upload)?;
        info!(remote_path, bytes, "reconciliation file uploaded");
        Ok(())
    }
}
