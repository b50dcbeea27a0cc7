//! Reconciliation upload-then-notify sequencing.
//!
//! GREEN when:
//! - With notify on, the upload happens first and the notify call follows,
//!   carrying the same descriptor the file was uploaded under.
//! - A failed upload never triggers a notify and surfaces as an upload error.
//! - With notify off (explicitly or by profile default) no notify is sent.
//! - The uploaded bytes are the summary row plus one row per record.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use cis_client::codec::parse_document;
use cis_client::{
    CisClient, CreditKind, FileTransport, HttpRequest, HttpTransport, PaidType, RawResponse,
    ReconciliationBatch, ReconciliationRecord, ReconciliationSummary, RequesterSettings,
    TransferSession, TransportError, UploadOptions,
};
use cis_config::{ReconciliationPolicy, ReconciliationProfile};
use serde_json::{json, Value};

type Log = Arc<Mutex<Vec<String>>>;

const OK_REPLY: &str = "<soap:Envelope><soap:Body><ns2:serviceResponse><return>&lt;PayWsResponse&gt;&lt;returnCode&gt;000&lt;/returnCode&gt;&lt;/PayWsResponse&gt;</return></ns2:serviceResponse></soap:Body></soap:Envelope>";

struct RecordingHttp {
    log: Log,
    bodies: Mutex<Vec<Value>>,
}

#[async_trait::async_trait]
impl HttpTransport for RecordingHttp {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let soap = parse_document(&request.body).unwrap();
        let inner = soap["soapenv:Body"]["lon:service"]["requestXml"]
            .as_str()
            .unwrap()
            .to_string();
        let doc = parse_document(&inner).unwrap();
        self.log
            .lock()
            .unwrap()
            .push(format!("http:{}", doc["serviceCode"].as_str().unwrap()));
        self.bodies.lock().unwrap().push(doc["data"].clone());
        Ok(RawResponse {
            status: 200,
            headers: Vec::new(),
            body: OK_REPLY.to_string(),
        })
    }
}

struct RecordingFiles {
    log: Log,
    fail: bool,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait::async_trait]
impl FileTransport for RecordingFiles {
    async fn upload(
        &self,
        session: &TransferSession,
        content: Vec<u8>,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        assert_eq!(session.username, "vendor");
        self.log.lock().unwrap().push(format!("upload:{remote_path}"));
        if self.fail {
            return Err(TransportError::Connect("ftp.test:21 refused".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((remote_path.to_string(), content));
        Ok(())
    }
}

struct Harness {
    client: CisClient,
    log: Log,
    http: Arc<RecordingHttp>,
    files: Arc<RecordingFiles>,
}

fn harness(policy: ReconciliationPolicy, upload_fails: bool) -> Harness {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let http = Arc::new(RecordingHttp {
        log: log.clone(),
        bodies: Mutex::new(Vec::new()),
    });
    let files = Arc::new(RecordingFiles {
        log: log.clone(),
        fail: upload_fails,
        uploads: Mutex::new(Vec::new()),
    });
    let client = CisClient::new(
        RequesterSettings {
            app_id: "UT000011".to_string(),
            cis_password_b64: "c2VjcmV0".to_string(),
            endpoint_url: "http://cis.test/superEdge/services/SuperEdgeService".to_string(),
            transfer_host: "ftp.test".to_string(),
            transfer_port: 21,
            transfer_username: Some("vendor".to_string()),
            transfer_password: Some("pw".to_string()),
        },
        policy,
        http.clone(),
        files.clone(),
    )
    .unwrap();
    Harness {
        client,
        log,
        http,
        files,
    }
}

fn batch() -> ReconciliationBatch {
    ReconciliationBatch {
        first_row: ReconciliationSummary {
            total_amount: 1250.75,
            total_record: 2,
            transaction_start_date: "20240301000000".to_string(),
            transaction_end_date: "20240301235959".to_string(),
        },
        records: vec![
            ReconciliationRecord {
                order_no: "20240301101010123011000001".to_string(),
                kind: CreditKind::Prepay,
                request_no: "04123456789".to_string(),
                amount_tendered: 1000.0,
                paid_type: PaidType::Pos,
                transaction_date: "20240301101012".to_string(),
                receipt_no: "R1".to_string(),
            },
            ReconciliationRecord {
                order_no: "20240301111111123011000002".to_string(),
                kind: CreditKind::Postpay,
                request_no: "0101150001".to_string(),
                amount_tendered: 250.75,
                paid_type: PaidType::Cheque,
                transaction_date: "20240301111113".to_string(),
                receipt_no: "R2".to_string(),
            },
        ],
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

#[tokio::test]
async fn upload_then_notify_with_same_descriptor() {
    let h = harness(ReconciliationProfile::Standard.preset(), false);
    let receipt = h
        .client
        .reconciler()
        .upload_reconciliation_file_for(&batch(), date(), Some(UploadOptions { notify: true }))
        .await
        .unwrap();

    assert_eq!(
        *h.log.lock().unwrap(),
        vec![
            "upload:Agency/UT000011/UT000011_COLLECTION_20240301.csv".to_string(),
            "http:NotifyAutoReconciliation".to_string(),
        ]
    );
    assert!(receipt.notified);
    assert_eq!(receipt.remote_path, "Agency/UT000011/UT000011_COLLECTION_20240301.csv");

    let bodies = h.http.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({
            "clientID": "UT000011",
            "fileType": "COLLECTION",
            "filePath": "Agency/UT000011",
            "fileName": "UT000011_COLLECTION_20240301.csv"
        })
    );

    let uploads = h.files.uploads.lock().unwrap();
    let csv = String::from_utf8(uploads[0].1.clone()).unwrap();
    assert_eq!(
        csv,
        "UT000011,1250.75,2,20240301000000,20240301235959\n\
         20240301101010123011000001,PREPAY,04123456789,1000,POS,20240301101012,R1\n\
         20240301111111123011000002,POSTPAY,0101150001,250.75,cheque,20240301111113,R2\n"
    );
    assert_eq!(receipt.bytes, csv.len());
}

#[tokio::test]
async fn failed_upload_never_notifies() {
    let h = harness(ReconciliationProfile::Standard.preset(), true);
    let err = h
        .client
        .reconciler()
        .upload_reconciliation_file_for(&batch(), date(), Some(UploadOptions { notify: true }))
        .await
        .unwrap_err();

    assert_eq!(err.status, 500);
    assert!(err.message.starts_with("Failed to upload reconciliation file"));
    assert_eq!(
        *h.log.lock().unwrap(),
        vec!["upload:Agency/UT000011/UT000011_COLLECTION_20240301.csv".to_string()]
    );
    assert!(h.http.bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notify_off_uploads_only() {
    let h = harness(ReconciliationProfile::Standard.preset(), false);
    let receipt = h
        .client
        .reconciler()
        .upload_reconciliation_file_for(&batch(), date(), Some(UploadOptions { notify: false }))
        .await
        .unwrap();
    assert!(!receipt.notified);
    assert_eq!(h.log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn hardened_profile_defaults_to_no_notify_and_no_extension() {
    let h = harness(ReconciliationProfile::Hardened.preset(), false);
    let receipt = h
        .client
        .reconciler()
        .upload_reconciliation_file_for(&batch(), date(), None)
        .await
        .unwrap();
    assert!(!receipt.notified);
    assert_eq!(receipt.remote_path, "Agency/UT000011/UT000011_COLLECTION_20240301");
    assert!(h.http.bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn standard_profile_defaults_to_notify() {
    let h = harness(ReconciliationProfile::Standard.preset(), false);
    let receipt = h
        .client
        .reconciler()
        .upload_reconciliation_file_for(&batch(), date(), None)
        .await
        .unwrap();
    assert!(receipt.notified);
    assert_eq!(h.http.bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn standalone_notify_uses_given_descriptor() {
    let h = harness(ReconciliationProfile::Standard.preset(), false);
    let mut descriptor = h.client.reconciler().descriptor_for(date());
    descriptor.file_name = "UT000011_COLLECTION_20240229.csv".to_string();

    assert!(h
        .client
        .reconciler()
        .notify_auto_reconciliation(Some(descriptor))
        .await
        .unwrap());
    let bodies = h.http.bodies.lock().unwrap();
    assert_eq!(bodies[0]["fileName"], json!("UT000011_COLLECTION_20240229.csv"));
    assert!(h.files.uploads.lock().unwrap().is_empty());
}
