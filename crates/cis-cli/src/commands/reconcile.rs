//! Reconciliation subcommands: upload (+ optional notify) and standalone notify.

use anyhow::{Context, Result};
use cis_client::{ReconciliationBatch, UploadOptions};

use super::{load_client, parse_date, ConfigArgs};

pub async fn upload(
    config: &ConfigArgs,
    records_path: &str,
    notify: Option<bool>,
    date: Option<&str>,
) -> Result<()> {
    let raw = std::fs::read_to_string(records_path)
        .with_context(|| format!("read records file failed: {records_path}"))?;
    let batch: ReconciliationBatch = serde_json::from_str(&raw)
        .with_context(|| format!("records file is not a reconciliation batch: {records_path}"))?;

    let client = load_client(config)?;
    let reconciler = client.reconciler();
    let date = match date {
        Some(raw) => parse_date(raw)?,
        None => reconciler.reference_date(),
    };
    let options = notify.map(|notify| UploadOptions { notify });

    let receipt = reconciler
        .upload_reconciliation_file_for(&batch, date, options)
        .await?;

    println!("remote_path={}", receipt.remote_path);
    println!("bytes={}", receipt.bytes);
    println!("notified={}", receipt.notified);
    Ok(())
}

pub async fn notify(config: &ConfigArgs, date: Option<&str>) -> Result<()> {
    let client = load_client(config)?;
    let reconciler = client.reconciler();
    let descriptor = match date {
        Some(raw) => Some(reconciler.descriptor_for(parse_date(raw)?)),
        None => None,
    };
    let notified = reconciler.notify_auto_reconciliation(descriptor).await?;
    println!("notified={notified}");
    Ok(())
}
