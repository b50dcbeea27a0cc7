use std::sync::Arc;
use std::time::Duration;

use cis_config::{ClientConfig, FileTransferEndpoint, FileTransferMode, ReconciliationPolicy};
use tracing::info;

use crate::api::{BaseApi, MiscApi, PowerApi, ReconcilerApi};
use crate::error::DomainError;
use crate::requester::{Requester, RequesterSettings};
use crate::transport::{
    FileTransport, FtpTransport, HttpOptions, HttpTransport, LocalDirTransport, ReqwestTransport,
};

/// Entry point. Cheap to clone; all groups share one requester.
#[derive(Clone)]
pub struct CisClient {
    power: PowerApi,
    reconciler: ReconcilerApi,
    misc: MiscApi,
}

impl CisClient {
    pub fn new(
        settings: RequesterSettings,
        policy: ReconciliationPolicy,
        http: Arc<dyn HttpTransport>,
        files: Arc<dyn FileTransport>,
    ) -> Result<Self, DomainError> {
        let requester = Arc::new(Requester::new(settings, http, files)?);
        let base = BaseApi::new(requester);
        Ok(Self {
            power: PowerApi::new(base.clone()),
            reconciler: ReconcilerApi::new(base.clone(), policy),
            misc: MiscApi::new(base),
        })
    }

    /// Build with the reqwest HTTP transport and the file transport selected
    /// by `file_transfer.mode`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, DomainError> {
        let s = &config.settings;
        let http = ReqwestTransport::new(HttpOptions {
            timeout: Duration::from_secs(s.cis.timeout_secs),
            skip_certificate_verification: s.cis.skip_certificate_verification,
        })?;

        info!(
            app_id = %s.client.app_id,
            endpoint = %s.cis.url(),
            file_transfer = ?s.file_transfer.mode,
            profile = ?s.reconciliation.profile,
            config_hash = %config.config_hash,
            "cis client configured"
        );
        Self::new(
            requester_settings(config),
            s.reconciliation.resolve(),
            Arc::new(http),
            file_transport(&s.file_transfer),
        )
    }

    pub fn power(&self) -> &PowerApi {
        &self.power
    }

    pub fn reconciler(&self) -> &ReconcilerApi {
        &self.reconciler
    }

    pub fn misc(&self) -> &MiscApi {
        &self.misc
    }
}

pub fn file_transport(endpoint: &FileTransferEndpoint) -> Arc<dyn FileTransport> {
    match endpoint.mode {
        FileTransferMode::Ftp => {
            let timeout = Duration::from_secs(endpoint.timeout_secs);
            Arc::new(FtpTransport::new(timeout))
        }
        FileTransferMode::Staging => Arc::new(LocalDirTransport::new(&endpoint.staging_root)),
    }
}

pub fn requester_settings(config: &ClientConfig) -> RequesterSettings {
    let s = &config.settings;
    RequesterSettings {
        app_id: s.client.app_id.clone(),
        cis_password_b64: config.secrets.cis_password_b64.clone(),
        endpoint_url: s.cis.url(),
        transfer_host: s.file_transfer.host.clone(),
        transfer_port: s.file_transfer.port,
        transfer_username: config.secrets.file_transfer_username.clone(),
        transfer_password: config.secrets.file_transfer_password.clone(),
    }
}
