use serde_json::Value;
use tracing::warn;

use super::BaseApi;
use crate::codec::Record;
use crate::error::DomainError;
use crate::models::{
    AcknowledgeRequest, ConfirmDetailsRequest, PurchaseCreditRequest, PurchaseOptions,
    PurchaseStatus, ReprintRequest, RetrieveDetailsRequest,
};
use crate::normalize::ResponseKind;

/// Customer lookup, vending and receipt operations.
#[derive(Clone)]
pub struct PowerApi {
    base: BaseApi,
}

impl PowerApi {
    pub(crate) fn new(base: BaseApi) -> Self {
        Self { base }
    }

    /// Look a customer up by meter number (MN) or account number (CN).
    pub async fn confirm_details(
        &self,
        request: &ConfirmDetailsRequest,
    ) -> Result<Record, DomainError> {
        let kind = ResponseKind::ConfirmDetails(request.confirmation_type);
        Ok(self.base.send(kind, request).await?.into_record()?)
    }

    /// Vend credit (PREPAY) or pay an account (POSTPAY).
    ///
    /// With `options.acknowledge`, a successful purchase is immediately
    /// confirmed with an Acknowledge carrying the returned `receiptNO`. A
    /// failed acknowledgement is returned as the error of this call.
    pub async fn purchase_credit(
        &self,
        request: &PurchaseCreditRequest,
        options: PurchaseOptions,
    ) -> Result<Record, DomainError> {
        let kind = ResponseKind::PurchaseCredit(request.kind);
        let record = self.base.send(kind, request).await?.into_record()?;

        if options.acknowledge {
            let receipt_no = match record.get("receiptNO") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    warn!(order_no = %request.order_no, "purchase response has no receiptNO");
                    String::new()
                }
            };
            let ack = AcknowledgeRequest {
                order_no: request.order_no.clone(),
                receipt_no,
                amount_tendered: request.amount_tendered,
                purchase_status: PurchaseStatus::Success,
            };
            if !self.acknowledge(&ack).await? {
                warn!(order_no = %request.order_no, "acknowledge returned a payload");
            }
        }
        Ok(record)
    }

    pub async fn reprint(&self, request: &ReprintRequest) -> Result<Vec<Record>, DomainError> {
        let normalized = self.base.send(ResponseKind::Reprint, request).await?;
        Ok(normalized.into_records()?)
    }

    pub async fn retrieve_details(
        &self,
        request: &RetrieveDetailsRequest,
    ) -> Result<Vec<Record>, DomainError> {
        let normalized = self.base.send(ResponseKind::RetrieveDetails, request).await?;
        Ok(normalized.into_records()?)
    }

    /// `true` when the backend accepted the acknowledgement without a payload.
    pub async fn acknowledge(&self, request: &AcknowledgeRequest) -> Result<bool, DomainError> {
        let normalized = self.base.send(ResponseKind::Acknowledge, request).await?;
        Ok(normalized.into_flag()?)
    }
}
