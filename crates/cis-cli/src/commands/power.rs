//! Power-vending subcommands: confirm, purchase, reprint, retrieve, acknowledge.

use anyhow::Result;
use cis_client::{
    AccountType, AcknowledgeRequest, ConfirmDetailsRequest, ConfirmationType, CreditKind,
    PaidType, PurchaseCreditRequest, PurchaseOptions, PurchaseStatus, Record, ReprintRequest,
    RetrieveDetailsRequest,
};
use serde_json::Value;
use tracing::info;

use super::{load_client, print_json, ConfigArgs};

pub struct PurchaseInput {
    pub order_no: Option<String>,
    pub kind: CreditKind,
    pub request_no: String,
    pub account_type: AccountType,
    pub amount: f64,
    pub paid_type: PaidType,
    pub acknowledge: bool,
}

pub async fn confirm(
    config: &ConfigArgs,
    confirmation_type: ConfirmationType,
    request_no: String,
) -> Result<()> {
    let client = load_client(config)?;
    let record = client
        .power()
        .confirm_details(&ConfirmDetailsRequest {
            confirmation_type,
            request_no,
        })
        .await?;
    print_json(&Value::Object(record))
}

pub async fn purchase(config: &ConfigArgs, input: PurchaseInput) -> Result<()> {
    let client = load_client(config)?;
    let order_no = match input.order_no {
        Some(order_no) => order_no,
        None => {
            let generated = client.misc().generate_order_no();
            info!(order_no = %generated, "generated orderNO");
            generated
        }
    };

    let record = client
        .power()
        .purchase_credit(
            &PurchaseCreditRequest {
                order_no,
                kind: input.kind,
                request_no: input.request_no,
                account_type: input.account_type,
                amount_tendered: input.amount,
                paid_type: input.paid_type,
            },
            PurchaseOptions {
                acknowledge: input.acknowledge,
            },
        )
        .await?;
    print_json(&Value::Object(record))
}

pub async fn reprint(
    config: &ConfigArgs,
    confirmation_type: ConfirmationType,
    request_no: String,
    order_no: Option<String>,
) -> Result<()> {
    let client = load_client(config)?;
    let records = client
        .power()
        .reprint(&ReprintRequest {
            confirmation_type,
            request_no,
            order_no,
        })
        .await?;
    print_records(records)
}

pub async fn retrieve(
    config: &ConfigArgs,
    begin_date: String,
    end_date: String,
    order_no: String,
) -> Result<()> {
    let client = load_client(config)?;
    let records = client
        .power()
        .retrieve_details(&RetrieveDetailsRequest {
            begin_date,
            end_date,
            order_no,
        })
        .await?;
    print_records(records)
}

pub async fn acknowledge(
    config: &ConfigArgs,
    order_no: String,
    receipt_no: String,
    amount: f64,
    status: PurchaseStatus,
) -> Result<()> {
    let client = load_client(config)?;
    let acknowledged = client
        .power()
        .acknowledge(&AcknowledgeRequest {
            order_no,
            receipt_no,
            amount_tendered: amount,
            purchase_status: status,
        })
        .await?;
    println!("acknowledged={acknowledged}");
    Ok(())
}

fn print_records(records: Vec<Record>) -> Result<()> {
    print_json(&Value::Array(
        records.into_iter().map(Value::Object).collect(),
    ))
}
