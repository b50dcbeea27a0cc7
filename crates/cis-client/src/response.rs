//! Response unwrapping.
//!
//! The backend returns its `PayWsResponse` document entity-escaped inside the
//! SOAP body, and `data.list` may itself be an escaped XML fragment of
//! `<index>` records. Both layers are decoded here.

use serde_json::Value;
use tracing::warn;

use crate::codec::{parse_document, unescape_angles};
use crate::error::CisError;

pub const SUCCESS_CODE: &str = "000";

const RESPONSE_PATH: [&str; 4] = ["soap:Body", "ns2:serviceResponse", "return", "PayWsResponse"];

/// Decode a raw response body into its `data` payload.
///
/// `Ok(None)` means the call succeeded without a payload.
pub fn unwrap_response(body: &str) -> Result<Option<Value>, CisError> {
    if body.trim().is_empty() {
        return Err(CisError::EmptyResponse);
    }

    let mut node = parse_document(&unescape_angles(body))?;
    for step in RESPONSE_PATH {
        node = take_child(node, step).ok_or_else(|| {
            CisError::Malformed(format!("unexpected response structure: missing <{step}>"))
        })?;
    }

    let Value::Object(mut payload) = node else {
        return Err(CisError::Malformed(
            "unexpected response structure: empty <PayWsResponse>".to_string(),
        ));
    };

    let return_code = payload.get("returnCode").and_then(scalar_text);
    if return_code.as_deref() != Some(SUCCESS_CODE) {
        let message = payload.get("message").and_then(scalar_text);
        warn!(return_code = ?return_code, message = ?message, "cis rejected request");
        return Err(CisError::Rejected {
            return_code: return_code.unwrap_or_default(),
            message,
        });
    }

    match payload.remove("data") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(mut data)) => {
            if let Some(list) = data.get_mut("list") {
                let spliced = splice_list(list.take())?;
                *list = spliced;
            }
            Ok(Some(Value::Object(data)))
        }
        Some(other) => Ok(Some(other)),
    }
}

/// Replace a `list` value with its `<index>` content: one record or an
/// array of them.
fn splice_list(list: Value) -> Result<Value, CisError> {
    match list {
        Value::String(raw) => {
            let wrapped = format!("<list>{}</list>", unescape_angles(&raw));
            Ok(index_of(parse_document(&wrapped)?))
        }
        structured @ Value::Object(_) => Ok(index_of(structured)),
        other => Ok(other),
    }
}

fn index_of(list: Value) -> Value {
    match list {
        Value::Object(mut map) => map.remove("index").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Exact key first, then a namespace-prefix-insensitive match.
fn take_child(node: Value, step: &str) -> Option<Value> {
    let Value::Object(mut map) = node else {
        return None;
    };
    if let Some(v) = map.remove(step) {
        return Some(v);
    }
    let local = local_name(step);
    let key = map.keys().find(|k| local_name(k) == local)?.clone();
    map.remove(&key)
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
