use chrono::{Local, NaiveDate};
use cis_config::ReconciliationPolicy;
use tracing::info;

use super::BaseApi;
use crate::error::DomainError;
use crate::models::{ReconciliationBatch, ReconciliationFileDescriptor, UploadOptions};
use crate::normalize::ResponseKind;
use crate::reconcile;

/// Outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub descriptor: ReconciliationFileDescriptor,
    pub remote_path: String,
    pub bytes: usize,
    pub notified: bool,
}

/// Daily reconciliation: CSV upload, then (optionally) notify CIS.
#[derive(Clone)]
pub struct ReconcilerApi {
    base: BaseApi,
    policy: ReconciliationPolicy,
}

impl ReconcilerApi {
    pub(crate) fn new(base: BaseApi, policy: ReconciliationPolicy) -> Self {
        Self { base, policy }
    }

    pub fn policy(&self) -> &ReconciliationPolicy {
        &self.policy
    }

    /// Business date a file uploaded now is named after.
    pub fn reference_date(&self) -> NaiveDate {
        reconcile::reference_date(self.policy.reference_day, Local::now().date_naive())
    }

    pub fn descriptor_for(&self, date: NaiveDate) -> ReconciliationFileDescriptor {
        reconcile::descriptor(self.base.app_id(), &self.policy, date)
    }

    /// Tell CIS a file is ready. Without a descriptor, the one for the
    /// current reference date is used.
    pub async fn notify_auto_reconciliation(
        &self,
        descriptor: Option<ReconciliationFileDescriptor>,
    ) -> Result<bool, DomainError> {
        let descriptor = descriptor.unwrap_or_else(|| self.descriptor_for(self.reference_date()));
        let notified = self
            .base
            .send(ResponseKind::NotifyAutoReconciliation, &descriptor)
            .await?
            .into_flag()?;
        info!(file_name = %descriptor.file_name, "auto reconciliation notified");
        Ok(notified)
    }

    /// Upload for the current reference date. `options` defaults to the
    /// configured policy.
    pub async fn upload_reconciliation_file(
        &self,
        batch: &ReconciliationBatch,
        options: Option<UploadOptions>,
    ) -> Result<UploadReceipt, DomainError> {
        self.upload_reconciliation_file_for(batch, self.reference_date(), options)
            .await
    }

    /// Notify runs only after the upload succeeded.
    pub async fn upload_reconciliation_file_for(
        &self,
        batch: &ReconciliationBatch,
        date: NaiveDate,
        options: Option<UploadOptions>,
    ) -> Result<UploadReceipt, DomainError> {
        let notify = options
            .map(|o| o.notify)
            .unwrap_or(self.policy.notify_after_upload);
        let descriptor = self.descriptor_for(date);
        let remote_path = descriptor.remote_path();

        let content = reconcile::render_csv(&reconcile::rows(self.base.app_id(), batch))?;
        let bytes = content.len();
        self.base
            .requester()
            .upload_reconciliation_file(content, &remote_path)
            .await?;

        let notified = if notify {
            self.notify_auto_reconciliation(Some(descriptor.clone()))
                .await?
        } else {
            false
        };

        Ok(UploadReceipt {
            descriptor,
            remote_path,
            bytes,
            notified,
        })
    }
}
