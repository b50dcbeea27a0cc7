//! Request envelope: `RequestDraft -> SignedRequest -> WrappedEnvelope`.
//!
//! Each stage consumes the previous one. Dispatching the wrapped envelope is
//! the requester's job.

use serde_json::{Map, Value};

use crate::codec::{to_xml, XmlStyle};
use crate::error::CisError;
use crate::models::OperationCode;
use crate::signer::{sign, Credential};
use crate::transport::{HttpMethod, HttpRequest};

pub const REQUEST_ROOT: &str = "PayWsRequest";
pub const SIGNATURE_ROOT: &str = "data";
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SERVICE_NS: &str = "http://www.longshine.com";
pub const CONTENT_TYPE: &str = "application/xml";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    operation: OperationCode,
    body: Map<String, Value>,
}

impl RequestDraft {
    pub fn new(operation: OperationCode, body: Value) -> Result<Self, CisError> {
        match body {
            Value::Object(body) => Ok(Self { operation, body }),
            other => Err(CisError::Serialization(format!(
                "{operation} body must be a record, got {other}"
            ))),
        }
    }

    /// Serialize a typed request body.
    pub fn from_body<T: serde::Serialize>(
        operation: OperationCode,
        body: &T,
    ) -> Result<Self, CisError> {
        let value = serde_json::to_value(body)
            .map_err(|e| CisError::Serialization(format!("{operation} body: {e}")))?;
        Self::new(operation, value)
    }

    pub fn operation(&self) -> OperationCode {
        self.operation
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn sign(
        self,
        app_id: &str,
        credential: &Credential,
        msg_id: String,
    ) -> Result<SignedRequest, CisError> {
        let canonical = to_xml(
            SIGNATURE_ROOT,
            &Value::Object(self.body.clone()),
            XmlStyle::Compact,
        )?;
        let signature = sign(app_id, self.operation.as_str(), credential, &canonical);
        Ok(SignedRequest {
            header: RequestHeader {
                service_code: self.operation,
                msg_id,
                app_id: app_id.to_string(),
                signature,
            },
            body: self.body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub service_code: OperationCode,
    pub msg_id: String,
    pub app_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    header: RequestHeader,
    body: Map<String, Value>,
}

impl SignedRequest {
    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    /// The `PayWsRequest` document: header fields, then the body as `data`.
    pub fn request_xml(&self) -> Result<String, CisError> {
        let mut doc = Map::new();
        doc.insert(
            "serviceCode".to_string(),
            Value::String(self.header.service_code.as_str().to_string()),
        );
        doc.insert("msgID".to_string(), Value::String(self.header.msg_id.clone()));
        doc.insert("appID".to_string(), Value::String(self.header.app_id.clone()));
        doc.insert(
            "signature".to_string(),
            Value::String(self.header.signature.clone()),
        );
        doc.insert("data".to_string(), Value::Object(self.body.clone()));
        to_xml(REQUEST_ROOT, &Value::Object(doc), XmlStyle::Pretty)
    }

    pub fn wrap(self) -> Result<WrappedEnvelope, CisError> {
        let payload = self.request_xml()?;
        Ok(WrappedEnvelope {
            header: self.header,
            soap: soap_envelope(&payload),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedEnvelope {
    header: RequestHeader,
    soap: String,
}

impl WrappedEnvelope {
    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn soap(&self) -> &str {
        &self.soap
    }

    pub fn into_http_request(self, url: &str) -> HttpRequest {
        HttpRequest {
            url: url.to_string(),
            method: HttpMethod::Post,
            headers: vec![("Content-Type".to_string(), CONTENT_TYPE.to_string())],
            body: self.soap,
        }
    }
}

/// `]]>` cannot appear inside a CDATA section; split it across two.
fn cdata_escape(payload: &str) -> String {
    payload.replace("]]>", "]]]]><![CDATA[>")
}

fn soap_envelope(payload: &str) -> String {
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="{SOAP_ENV_NS}" xmlns:lon="{SERVICE_NS}">
   <soapenv:Header/>
   <soapenv:Body>
      <lon:service>
         <requestXml><![CDATA[{}]]></requestXml>
      </lon:service>
   </soapenv:Body>
</soapenv:Envelope>"#,
        cdata_escape(payload)
    )
}
