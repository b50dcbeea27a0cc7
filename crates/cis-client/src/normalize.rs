//! Per-operation response normalization.
//!
//! Each (operation, discriminant) pair has a fixed set of numeric fields and,
//! for some, a semantic name for `list`. Dispatch is an exhaustive match so
//! adding an operation forces a decision here.

use serde_json::{Number, Value};
use tracing::warn;

use crate::codec::{OneOrMany, Record};
use crate::error::CisError;
use crate::models::{ConfirmationType, CreditKind, OperationCode};

const CONFIRM_METER_NUMERIC: &[&str] = &[
    "orgNO",
    "dtNO",
    "rate",
    "vatRate",
    "balance",
    "arrears",
    "refund",
    "adjustUnits",
    "presetUnits",
    "minimumVend",
];

const CONFIRM_ACCOUNT_NUMERIC: &[&str] = &[
    "dtNO",
    "rate",
    "vatRate",
    "balance",
    "orgNO",
    "outstandingDebt",
];

const PURCHASE_PREPAY_NUMERIC: &[&str] = &[
    "orgNO",
    "dtNO",
    "rate",
    "vatRate",
    "balance",
    "units",
    "refund",
    "walletBalance",
    "adjustUnits",
    "presetUnits",
    "totalUnits",
    "amountTendered",
];

const PURCHASE_POSTPAY_NUMERIC: &[&str] = &[
    "payments",
    "rate",
    "vatRate",
    "balance",
    "walletBalance",
    "remainingDebt",
    "outstandingDebt",
];

const LISTING_NUMERIC: &[&str] = &["amountTendered"];

pub const MIN_VEND_BREAKDOWN: &str = "minVendBreakdown";
pub const CREDIT_BREAKDOWN: &str = "creditBreakdown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    ConfirmDetails(ConfirmationType),
    PurchaseCredit(CreditKind),
    Reprint,
    RetrieveDetails,
    Acknowledge,
    NotifyAutoReconciliation,
}

impl ResponseKind {
    pub fn operation(self) -> OperationCode {
        match self {
            ResponseKind::ConfirmDetails(_) => OperationCode::ConfirmDetails,
            ResponseKind::PurchaseCredit(_) => OperationCode::PurchaseCredit,
            ResponseKind::Reprint => OperationCode::Reprint,
            ResponseKind::RetrieveDetails => OperationCode::RetrieveDetails,
            ResponseKind::Acknowledge => OperationCode::Acknowledge,
            ResponseKind::NotifyAutoReconciliation => OperationCode::NotifyAutoReconciliation,
        }
    }

    /// Fields coerced to numbers. For listings this applies per record.
    pub fn numeric_fields(self) -> &'static [&'static str] {
        match self {
            ResponseKind::ConfirmDetails(ConfirmationType::MeterNumber) => CONFIRM_METER_NUMERIC,
            ResponseKind::ConfirmDetails(ConfirmationType::AccountNumber) => {
                CONFIRM_ACCOUNT_NUMERIC
            }
            ResponseKind::PurchaseCredit(CreditKind::Prepay) => PURCHASE_PREPAY_NUMERIC,
            ResponseKind::PurchaseCredit(CreditKind::Postpay) => PURCHASE_POSTPAY_NUMERIC,
            ResponseKind::Reprint | ResponseKind::RetrieveDetails => LISTING_NUMERIC,
            ResponseKind::Acknowledge | ResponseKind::NotifyAutoReconciliation => &[],
        }
    }

    /// Name `list` is exposed under, if it is renamed at all.
    pub fn breakdown_field(self) -> Option<&'static str> {
        match self {
            ResponseKind::ConfirmDetails(ConfirmationType::MeterNumber) => Some(MIN_VEND_BREAKDOWN),
            ResponseKind::PurchaseCredit(CreditKind::Prepay) => Some(CREDIT_BREAKDOWN),
            ResponseKind::PurchaseCredit(CreditKind::Postpay) => Some(MIN_VEND_BREAKDOWN),
            ResponseKind::ConfirmDetails(ConfirmationType::AccountNumber)
            | ResponseKind::Reprint
            | ResponseKind::RetrieveDetails
            | ResponseKind::Acknowledge
            | ResponseKind::NotifyAutoReconciliation => None,
        }
    }
}

/// Normalized result in one of its three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(Record),
    Records(Vec<Record>),
    Flag(bool),
}

impl Normalized {
    fn shape(&self) -> &'static str {
        match self {
            Normalized::Record(_) => "record",
            Normalized::Records(_) => "listing",
            Normalized::Flag(_) => "flag",
        }
    }

    fn mismatch(&self, expected: &str) -> CisError {
        CisError::Malformed(format!("expected a normalized {expected}, got a {}", self.shape()))
    }

    pub fn into_record(self) -> Result<Record, CisError> {
        match self {
            Normalized::Record(record) => Ok(record),
            other => Err(other.mismatch("record")),
        }
    }

    pub fn into_records(self) -> Result<Vec<Record>, CisError> {
        match self {
            Normalized::Records(records) => Ok(records),
            other => Err(other.mismatch("listing")),
        }
    }

    pub fn into_flag(self) -> Result<bool, CisError> {
        match self {
            Normalized::Flag(flag) => Ok(flag),
            other => Err(other.mismatch("flag")),
        }
    }
}

pub fn normalize(kind: ResponseKind, data: Option<Value>) -> Normalized {
    match kind {
        ResponseKind::ConfirmDetails(_) | ResponseKind::PurchaseCredit(_) => {
            Normalized::Record(normalize_record(kind, data))
        }
        ResponseKind::Reprint | ResponseKind::RetrieveDetails => {
            Normalized::Records(normalize_listing(data))
        }
        ResponseKind::Acknowledge => Normalized::Flag(acknowledged(&data)),
        ResponseKind::NotifyAutoReconciliation => Normalized::Flag(true),
    }
}

/// Coerce numeric fields and rename `list` to its breakdown name.
/// A missing payload yields an empty record.
pub fn normalize_record(kind: ResponseKind, data: Option<Value>) -> Record {
    let mut record = match data {
        Some(Value::Object(record)) => record,
        None => Record::new(),
        Some(other) => {
            warn!(operation = %kind.operation(), payload = %other, "non-record payload dropped");
            Record::new()
        }
    };

    coerce_numeric(&mut record, kind.numeric_fields());

    if let Some(field) = kind.breakdown_field() {
        if let Some(list) = record.remove("list") {
            if let Some(items) = OneOrMany::from_value(list) {
                record.insert(field.to_string(), Value::Array(items.into_vec()));
            }
        }
    }
    record
}

/// Reprint / RetrieveDetails: `list` is the result. Absent means empty.
pub fn normalize_listing(data: Option<Value>) -> Vec<Record> {
    let Some(Value::Object(mut data)) = data else {
        return Vec::new();
    };
    let Some(items) = data.remove("list").and_then(OneOrMany::from_value) else {
        return Vec::new();
    };

    items
        .into_vec()
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(mut record) => {
                coerce_numeric(&mut record, LISTING_NUMERIC);
                Some(record)
            }
            other => {
                warn!(item = %other, "listing entry is not a record; skipped");
                None
            }
        })
        .collect()
}

/// Acknowledge reports success by returning no payload at all.
pub fn acknowledged(data: &Option<Value>) -> bool {
    data.is_none()
}

/// Replace numeric strings under `fields` with numbers. Absent fields stay
/// absent; text that is not a number is left as is.
///
/// Text without a decimal point or exponent that fits an `i64` becomes an
/// integer (`"500"` -> `500`); everything else becomes an `f64`
/// (`"500.00"` -> `500.0`). Both compare equal through `Value::as_f64`.
pub fn coerce_numeric(record: &mut Record, fields: &[&str]) {
    for field in fields {
        let Some(value) = record.get_mut(*field) else {
            continue;
        };
        let Value::String(text) = value else {
            continue;
        };
        match parse_number(text) {
            Some(n) => *value = Value::Number(n),
            None => warn!(field, text = %text, "numeric field is not a number; left as text"),
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    let integral = !t.contains(['.', 'e', 'E']);
    if integral {
        if let Ok(i) = t.parse::<i64>() {
            return Some(Number::from(i));
        }
    }
    t.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Option<Value> {
        Some(v)
    }

    #[test]
    fn meter_confirmation_coerces_table_fields_only() {
        let out = normalize_record(
            ResponseKind::ConfirmDetails(ConfirmationType::MeterNumber),
            record(json!({
                "accountNO": "0101150001",
                "orgNO": "12",
                "balance": "100.50",
                "minimumVend": "1500",
                "meterSerialNO": "04123456789",
            })),
        );
        assert_eq!(out["orgNO"], json!(12));
        assert_eq!(out["balance"], json!(100.5));
        assert_eq!(out["minimumVend"], json!(1500));
        // Digit strings outside the table stay text.
        assert_eq!(out["accountNO"], json!("0101150001"));
        assert_eq!(out["meterSerialNO"], json!("04123456789"));
        // Absent table fields are not invented.
        assert!(!out.contains_key("arrears"));
        assert!(!out.contains_key(MIN_VEND_BREAKDOWN));
    }

    #[test]
    fn breakdown_is_always_a_list() {
        let kind = ResponseKind::PurchaseCredit(CreditKind::Prepay);
        let one = normalize_record(kind, record(json!({ "list": { "feeType": "vat" } })));
        assert_eq!(one[CREDIT_BREAKDOWN], json!([{ "feeType": "vat" }]));
        assert!(!one.contains_key("list"));

        let many = normalize_record(
            kind,
            record(json!({ "list": [{ "feeType": "vat" }, { "feeType": "msc" }] })),
        );
        assert_eq!(many[CREDIT_BREAKDOWN].as_array().unwrap().len(), 2);

        let postpay = normalize_record(
            ResponseKind::PurchaseCredit(CreditKind::Postpay),
            record(json!({ "list": { "feeType": "lor" } })),
        );
        assert_eq!(postpay[MIN_VEND_BREAKDOWN], json!([{ "feeType": "lor" }]));
    }

    #[test]
    fn account_confirmation_keeps_list_untouched() {
        let out = normalize_record(
            ResponseKind::ConfirmDetails(ConfirmationType::AccountNumber),
            record(json!({ "outstandingDebt": "25.00", "list": { "x": "1" } })),
        );
        assert_eq!(out["outstandingDebt"], json!(25.0));
        assert_eq!(out["list"], json!({ "x": "1" }));
    }

    #[test]
    fn unparseable_numeric_text_is_left_alone() {
        let out = normalize_record(
            ResponseKind::PurchaseCredit(CreditKind::Postpay),
            record(json!({ "payments": "N/A", "rate": null })),
        );
        assert_eq!(out["payments"], json!("N/A"));
        assert_eq!(out["rate"], Value::Null);
    }

    #[test]
    fn missing_payload_gives_empty_record() {
        let out = normalize_record(ResponseKind::PurchaseCredit(CreditKind::Prepay), None);
        assert!(out.is_empty());
    }

    #[test]
    fn listing_collapses_one_many_and_none() {
        let one = normalize_listing(record(json!({
            "list": { "receiptNO": "R1", "amountTendered": "500" }
        })));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0]["amountTendered"], json!(500));

        let many = normalize_listing(record(json!({ "list": [
            { "receiptNO": "R1", "amountTendered": "500" },
            { "receiptNO": "R2", "amountTendered": "750.25" },
            { "receiptNO": "R3" }
        ] })));
        assert_eq!(many.len(), 3);
        assert_eq!(many[1]["amountTendered"], json!(750.25));
        assert!(!many[2].contains_key("amountTendered"));

        assert!(normalize_listing(None).is_empty());
        assert!(normalize_listing(record(json!({ "list": null }))).is_empty());
        assert!(normalize_listing(record(json!({ "other": "x" }))).is_empty());
    }

    #[test]
    fn acknowledge_is_true_only_without_payload() {
        assert_eq!(normalize(ResponseKind::Acknowledge, None), Normalized::Flag(true));
        assert_eq!(
            normalize(ResponseKind::Acknowledge, record(json!({ "x": "1" }))),
            Normalized::Flag(false)
        );
    }

    #[test]
    fn dispatch_picks_shape_per_operation() {
        let confirm = normalize(
            ResponseKind::ConfirmDetails(ConfirmationType::AccountNumber),
            record(json!({ "balance": "3" })),
        );
        assert_eq!(confirm.clone().into_record().unwrap()["balance"], json!(3));
        let err = confirm.into_flag().unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed response: expected a normalized flag, got a record"
        );

        let listing = normalize(ResponseKind::Reprint, None);
        assert_eq!(listing.into_records().unwrap(), Vec::<Record>::new());

        // Notify succeeds on any envelope that got past the returnCode check.
        let notify = normalize(ResponseKind::NotifyAutoReconciliation, record(json!({ "x": "1" })));
        assert!(notify.clone().into_flag().unwrap());
        assert!(matches!(notify.into_record(), Err(CisError::Malformed(_))));
    }

    #[test]
    fn dispatch_table_is_consistent() {
        let all = [
            ResponseKind::ConfirmDetails(ConfirmationType::MeterNumber),
            ResponseKind::ConfirmDetails(ConfirmationType::AccountNumber),
            ResponseKind::PurchaseCredit(CreditKind::Prepay),
            ResponseKind::PurchaseCredit(CreditKind::Postpay),
            ResponseKind::Reprint,
            ResponseKind::RetrieveDetails,
            ResponseKind::Acknowledge,
            ResponseKind::NotifyAutoReconciliation,
        ];
        for kind in all {
            if kind.breakdown_field().is_some() {
                assert!(!kind.numeric_fields().is_empty(), "{kind:?}");
            }
        }
        assert_eq!(
            ResponseKind::PurchaseCredit(CreditKind::Postpay).operation(),
            OperationCode::PurchaseCredit
        );
    }

    #[test]
    fn integers_stay_integers_and_decimals_become_floats() {
        assert_eq!(parse_number("42"), Some(Number::from(42)));
        assert_eq!(parse_number(" -7 "), Some(Number::from(-7)));
        assert_eq!(parse_number("0.075").and_then(|n| n.as_f64()), Some(0.075));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        // Past i64 range the value still parses, as a float.
        assert_eq!(
            parse_number("9223372036854775808").and_then(|n| n.as_f64()),
            Some(9.223372036854776e18)
        );
    }

    #[test]
    fn coerced_forms_follow_the_text() {
        let mut rec = Record::new();
        rec.insert("whole".to_string(), json!("500"));
        rec.insert("decimal".to_string(), json!("500.00"));
        rec.insert("exp".to_string(), json!("5e2"));
        coerce_numeric(&mut rec, &["whole", "decimal", "exp"]);

        assert!(rec["whole"].is_i64());
        assert!(rec["decimal"].is_f64());
        assert!(rec["exp"].is_f64());
        for field in ["whole", "decimal", "exp"] {
            assert_eq!(rec[field].as_f64(), Some(500.0), "{field}");
        }
        assert_eq!(serde_json::to_string(&rec["whole"]).unwrap(), "500");
        assert_eq!(serde_json::to_string(&rec["decimal"]).unwrap(), "500.0");
    }
}
