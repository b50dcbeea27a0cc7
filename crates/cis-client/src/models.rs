//! Request bodies and reconciliation records, named the way the backend
//! names its fields. Field order is wire order: it feeds the signature.

use serde::{Deserialize, Serialize};

/// Service codes understood by the SOAP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationCode {
    ConfirmDetails,
    PurchaseCredit,
    Reprint,
    Acknowledge,
    RetrieveDetails,
    NotifyAutoReconciliation,
}

impl OperationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationCode::ConfirmDetails => "ConfirmDetails",
            OperationCode::PurchaseCredit => "PurchaseCredit",
            OperationCode::Reprint => "Reprint",
            OperationCode::Acknowledge => "Acknowledge",
            OperationCode::RetrieveDetails => "RetrieveDetails",
            OperationCode::NotifyAutoReconciliation => "NotifyAutoReconciliation",
        }
    }
}

impl std::fmt::Display for OperationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `requestNO` identifies the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmationType {
    /// Meter number (prepaid).
    #[serde(rename = "MN")]
    MeterNumber,
    /// Customer account number (postpaid).
    #[serde(rename = "CN")]
    AccountNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditKind {
    Prepay,
    Postpay,
}

/// Maximum-demand vs non-maximum-demand customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "MD")]
    MaximumDemand,
    #[serde(rename = "NMD")]
    NonMaximumDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaidType {
    #[serde(rename = "bankteller")]
    BankTeller,
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "cheque")]
    Cheque,
    /// Card payment at a terminal.
    #[serde(rename = "POS")]
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmDetailsRequest {
    #[serde(rename = "type")]
    pub confirmation_type: ConfirmationType,
    /// Meter number for MN, account number for CN.
    #[serde(rename = "requestNO")]
    pub request_no: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseCreditRequest {
    #[serde(rename = "orderNO")]
    pub order_no: String,
    pub kind: CreditKind,
    #[serde(rename = "requestNO")]
    pub request_no: String,
    #[serde(rename = "accountType")]
    pub account_type: AccountType,
    #[serde(rename = "amountTendered")]
    pub amount_tendered: f64,
    #[serde(rename = "paidType")]
    pub paid_type: PaidType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurchaseOptions {
    /// Confirm the purchase with an Acknowledge call once it succeeds.
    pub acknowledge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprintRequest {
    #[serde(rename = "type")]
    pub confirmation_type: ConfirmationType,
    #[serde(rename = "requestNO")]
    pub request_no: String,
    #[serde(rename = "orderNO", default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveDetailsRequest {
    /// yyyyMMdd
    #[serde(rename = "beginDate")]
    pub begin_date: String,
    /// yyyyMMdd
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "orderNO")]
    pub order_no: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    #[serde(rename = "orderNO")]
    pub order_no: String,
    /// Required by the backend when the status is SUCCESS.
    #[serde(rename = "receiptNO")]
    pub receipt_no: String,
    #[serde(rename = "amountTendered")]
    pub amount_tendered: f64,
    #[serde(rename = "purchaseStatus")]
    pub purchase_status: PurchaseStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReconciliationFileType {
    Collection,
}

/// Where the reconciliation file lives; also the Notify request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationFileDescriptor {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "fileType")]
    pub file_type: ReconciliationFileType,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

impl ReconciliationFileDescriptor {
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.file_path, self.file_name)
    }
}

/// Summary row at the top of a reconciliation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub total_amount: f64,
    pub total_record: u64,
    /// yyyyMMddHHmmss
    pub transaction_start_date: String,
    /// yyyyMMddHHmmss
    pub transaction_end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    #[serde(rename = "orderNO")]
    pub order_no: String,
    pub kind: CreditKind,
    #[serde(rename = "requestNO")]
    pub request_no: String,
    #[serde(rename = "amountTendered")]
    pub amount_tendered: f64,
    #[serde(rename = "paidType")]
    pub paid_type: PaidType,
    #[serde(rename = "transactionDate")]
    pub transaction_date: String,
    #[serde(rename = "receiptNO")]
    pub receipt_no: String,
}

/// Input to a reconciliation upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationBatch {
    pub first_row: ReconciliationSummary,
    pub records: Vec<ReconciliationRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Send NotifyAutoReconciliation after a successful upload.
    pub notify: bool,
}
