//! Reconciliation file layout.
//!
//! One summary row `[clientId, totalAmount, totalRecord, start, end]`
//! followed by one row per transaction
//! `[orderNO, kind, requestNO, amountTendered, paidType, transactionDate, receiptNO]`.
//! Rows have different widths, so the CSV writer runs in flexible mode.

use chrono::NaiveDate;
use cis_config::{ReconciliationPolicy, ReferenceDay};

use crate::codec::format_f64;
use crate::error::CisError;
use crate::models::{
    ReconciliationBatch, ReconciliationFileDescriptor, ReconciliationFileType, ReconciliationRecord,
};

pub const FILE_TYPE_LABEL: &str = "COLLECTION";

/// The business date a file is named after.
pub fn reference_date(day: ReferenceDay, today: NaiveDate) -> NaiveDate {
    match day {
        ReferenceDay::Today => today,
        ReferenceDay::Yesterday => today.pred_opt().unwrap_or(today),
    }
}

pub fn descriptor(
    client_id: &str,
    policy: &ReconciliationPolicy,
    date: NaiveDate,
) -> ReconciliationFileDescriptor {
    let root = policy.remote_root.trim_end_matches('/');
    let file_path = if root.is_empty() {
        client_id.to_string()
    } else {
        format!("{root}/{client_id}")
    };
    let file_name = format!(
        "{client_id}_{FILE_TYPE_LABEL}_{}{}",
        date.format("%Y%m%d"),
        policy.file_extension.as_deref().unwrap_or("")
    );
    ReconciliationFileDescriptor {
        client_id: client_id.to_string(),
        file_type: ReconciliationFileType::Collection,
        file_path,
        file_name,
    }
}

pub fn rows(client_id: &str, batch: &ReconciliationBatch) -> Vec<Vec<String>> {
    let summary = &batch.first_row;
    let mut out = Vec::with_capacity(batch.records.len() + 1);
    out.push(vec![
        client_id.to_string(),
        format_f64(summary.total_amount),
        summary.total_record.to_string(),
        summary.transaction_start_date.clone(),
        summary.transaction_end_date.clone(),
    ]);
    out.extend(batch.records.iter().map(record_row));
    out
}

fn record_row(r: &ReconciliationRecord) -> Vec<String> {
    vec![
        r.order_no.clone(),
        enum_label(&r.kind),
        r.request_no.clone(),
        format_f64(r.amount_tendered),
        enum_label(&r.paid_type),
        r.transaction_date.clone(),
        r.receipt_no.clone(),
    ]
}

/// Wire label of a unit enum (its serde rename).
fn enum_label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

pub fn render_csv(rows: &[Vec<String>]) -> Result<Vec<u8>, CisError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| CisError::Serialization(format!("csv row: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| CisError::Serialization(format!("csv flush: {e}")))
}
