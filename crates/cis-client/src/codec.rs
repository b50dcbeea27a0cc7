//! XML <-> record conversion for the CIS wire format.
//!
//! Records are `serde_json` maps (insertion-ordered), so the same value can
//! be signed, serialized and handed back to callers without an intermediate
//! model.
//!
//! Serialization rules:
//! - record -> nested elements, in key order
//! - array  -> repeated sibling elements with the same tag
//! - null / empty string / empty record -> `<tag/>`
//! - numbers render without a trailing `.0` when integral
//!
//! Parsing rules (the backend's reference client behaves the same way):
//! - attributes, comments and processing instructions are ignored
//! - the root element is elided: the result is the root's content
//! - element text is whitespace-collapsed; empty elements become `null`
//! - `true` / `false` (any case) become booleans, all other text stays text
//! - repeated siblings become an array, a single child stays a bare value

use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

use crate::error::CisError;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlStyle {
    /// Two-space indented; used for the request document.
    Pretty,
    /// No whitespace between elements; used as signature input.
    Compact,
}

/// A list field as the parser delivers it: one bare child collapses to a
/// value, two or more become an array.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OneOrMany<Value> {
    /// `null` means the list was absent.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(OneOrMany::Many(items)),
            other => Some(OneOrMany::One(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize `record` as the content of a `<root>` element. No XML
/// declaration is emitted.
pub fn to_xml(root: &str, record: &Value, style: XmlStyle) -> Result<String, CisError> {
    if !record.is_object() {
        return Err(CisError::Serialization(format!(
            "root <{root}> must be a record, got {}",
            value_kind(record)
        )));
    }

    let mut writer = match style {
        XmlStyle::Pretty => Writer::new_with_indent(Vec::new(), b' ', 2),
        XmlStyle::Compact => Writer::new(Vec::new()),
    };
    write_element(&mut writer, root, record)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| CisError::Serialization(format!("xml output is not utf-8: {e}")))
}

fn write_element<W: Write>(w: &mut Writer<W>, name: &str, value: &Value) -> Result<(), CisError> {
    check_element_name(name)?;
    match value {
        Value::Null => empty(w, name),
        Value::Bool(b) => text_element(w, name, if *b { "true" } else { "false" }),
        Value::Number(n) => text_element(w, name, &format_number(n)),
        Value::String(s) if s.is_empty() => empty(w, name),
        Value::String(s) => text_element(w, name, s),
        Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(CisError::Serialization(format!(
                        "<{name}> holds a nested array, which has no xml form"
                    )));
                }
                write_element(w, name, item)?;
            }
            Ok(())
        }
        Value::Object(map) if map.is_empty() => empty(w, name),
        Value::Object(map) => {
            emit(w, Event::Start(BytesStart::new(name)))?;
            for (key, child) in map {
                write_element(w, key, child)?;
            }
            emit(w, Event::End(BytesEnd::new(name)))
        }
    }
}

fn emit<W: Write>(w: &mut Writer<W>, event: Event<'_>) -> Result<(), CisError> {
    w.write_event(event).map_err(ser)
}

fn empty<W: Write>(w: &mut Writer<W>, name: &str) -> Result<(), CisError> {
    emit(w, Event::Empty(BytesStart::new(name)))
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<(), CisError> {
    emit(w, Event::Start(BytesStart::new(name)))?;
    // Only & < > are escaped; quotes stay literal in text nodes.
    emit(w, Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    emit(w, Event::End(BytesEnd::new(name)))
}

fn check_element_name(name: &str) -> Result<(), CisError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(is_name_char);
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(CisError::Serialization(format!(
            "'{name}' is not a valid element name"
        )))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Render a number the way the backend's reference client does: integral
/// values carry no fractional part (`500`, not `500.0`).
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_f64(f),
        None => n.to_string(),
    }
}

pub fn format_f64(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}

fn ser(e: quick_xml::Error) -> CisError {
    CisError::Serialization(e.to_string())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Replace `&lt;` / `&gt;` with literal angle brackets. The backend escapes
/// its inner document once more than XML requires.
pub fn unescape_angles(raw: &str) -> String {
    raw.replace("&lt;", "<").replace("&gt;", ">")
}

struct Frame {
    name: String,
    children: Record,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Record::new(),
            text: String::new(),
        }
    }

    fn add_child(&mut self, name: String, value: Value) {
        // Element values are never arrays themselves, so an array here can
        // only come from an earlier repeat.
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self) -> (String, Value) {
        let value = if !self.children.is_empty() {
            Value::Object(self.children)
        } else {
            text_value(&self.text)
        };
        (self.name, value)
    }
}

fn text_value(raw: &str) -> Value {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        Value::Null
    } else if collapsed.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if collapsed.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::String(collapsed)
    }
}

/// Parse a document and return the content of its root element.
pub fn parse_document(xml: &str) -> Result<Value, CisError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(CisError::Malformed(format!(
                    "xml parse failed at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(start) => stack.push(Frame::new(element_name(&start)?)),
            Event::Empty(start) => {
                let name = element_name(&start)?;
                attach(&mut stack, &mut root, name, Value::Null)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| CisError::Malformed(format!("bad text entity: {e}")))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let s = std::str::from_utf8(&data)
                        .map_err(|e| CisError::Malformed(format!("cdata is not utf-8: {e}")))?;
                    top.text.push_str(s);
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| CisError::Malformed("unbalanced end tag".to_string()))?;
                let (name, value) = frame.finish();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CisError::Malformed(format!(
            "document ended inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| CisError::Malformed("document has no root element".to_string()))
}

fn element_name(start: &BytesStart<'_>) -> Result<String, CisError> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| CisError::Malformed(format!("element name is not utf-8: {e}")))
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) -> Result<(), CisError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.add_child(name, value);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(value);
            Ok(())
        }
        None => Err(CisError::Malformed(format!(
            "second root element <{name}>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_output_has_no_whitespace_or_declaration() {
        let body = json!({ "type": "MN", "requestNO": "0101150001" });
        let xml = to_xml("data", &body, XmlStyle::Compact).unwrap();
        assert_eq!(xml, "<data><type>MN</type><requestNO>0101150001</requestNO></data>");
    }

    #[test]
    fn pretty_output_indents_nested_records() {
        let body = json!({ "serviceCode": "Reprint", "data": { "type": "CN" } });
        let xml = to_xml("PayWsRequest", &body, XmlStyle::Pretty).unwrap();
        assert_eq!(
            xml,
            "<PayWsRequest>\n  <serviceCode>Reprint</serviceCode>\n  <data>\n    <type>CN</type>\n  </data>\n</PayWsRequest>"
        );
    }

    #[test]
    fn arrays_repeat_and_nulls_self_close() {
        let body = json!({ "orderNO": null, "item": ["a", "b"] });
        let xml = to_xml("data", &body, XmlStyle::Compact).unwrap();
        assert_eq!(xml, "<data><orderNO/><item>a</item><item>b</item></data>");
    }

    #[test]
    fn numbers_render_like_the_reference_client() {
        let body = json!({ "a": 500.0, "b": 123.45, "c": 7, "d": true });
        let xml = to_xml("data", &body, XmlStyle::Compact).unwrap();
        assert_eq!(xml, "<data><a>500</a><b>123.45</b><c>7</c><d>true</d></data>");
    }

    #[test]
    fn text_escapes_markup_but_not_quotes() {
        let body = json!({ "name": "A & B <C> \"D\"" });
        let xml = to_xml("data", &body, XmlStyle::Compact).unwrap();
        assert_eq!(xml, "<data><name>A &amp; B &lt;C&gt; \"D\"</name></data>");
    }

    #[test]
    fn non_record_root_and_bad_names_fail() {
        assert!(matches!(
            to_xml("data", &json!("x"), XmlStyle::Compact),
            Err(CisError::Serialization(_))
        ));
        assert!(matches!(
            to_xml("data", &json!({ "1bad": 1 }), XmlStyle::Compact),
            Err(CisError::Serialization(_))
        ));
        assert!(matches!(
            to_xml("data", &json!({ "x": [[1]] }), XmlStyle::Compact),
            Err(CisError::Serialization(_))
        ));
    }

    #[test]
    fn element_names_allow_prefixes_dots_and_dashes() {
        let body = json!({ "lon:service": { "a-b": "1", "c.d": {}, "_e": "" } });
        let xml = to_xml("soap_Body", &body, XmlStyle::Compact).unwrap();
        assert_eq!(
            xml,
            "<soap_Body><lon:service><a-b>1</a-b><c.d/><_e/></lon:service></soap_Body>"
        );
        for bad in ["-x", ".x", "a b", "a/b", ""] {
            let err = to_xml("data", &json!({ bad: 1 }), XmlStyle::Compact).unwrap_err();
            assert!(err.to_string().contains("is not a valid element name"), "{bad:?}: {err}");
        }
    }

    #[test]
    fn structurally_different_bodies_serialize_differently() {
        let flat = to_xml("data", &json!({ "a": "b" }), XmlStyle::Compact).unwrap();
        let nested = to_xml("data", &json!({ "a": { "b": null } }), XmlStyle::Compact).unwrap();
        assert_ne!(flat, nested);
    }

    #[test]
    fn parse_elides_root_and_coerces_text() {
        let v = parse_document(
            "<r><code>000</code><ok>TRUE</ok><none/><blank></blank><msg>  a \n  b </msg></r>",
        )
        .unwrap();
        assert_eq!(
            v,
            json!({ "code": "000", "ok": true, "none": null, "blank": null, "msg": "a b" })
        );
    }

    #[test]
    fn parse_collapses_single_child_and_arrays_repeats() {
        let one = parse_document("<list><index><n>1</n></index></list>").unwrap();
        assert_eq!(one, json!({ "index": { "n": "1" } }));

        let many =
            parse_document("<list><index><n>1</n></index><index><n>2</n></index><index><n>3</n></index></list>")
                .unwrap();
        assert_eq!(
            many,
            json!({ "index": [{ "n": "1" }, { "n": "2" }, { "n": "3" }] })
        );
    }

    #[test]
    fn parse_ignores_attributes_and_keeps_prefixes() {
        let v = parse_document(
            r#"<soap:Envelope xmlns:soap="urn:x"><soap:Body a="1"><x>1</x></soap:Body></soap:Envelope>"#,
        )
        .unwrap();
        assert_eq!(v, json!({ "soap:Body": { "x": "1" } }));
    }

    #[test]
    fn parse_reads_cdata_verbatim() {
        let v = parse_document("<r><list><![CDATA[<index><a>1</a></index>]]></list></r>").unwrap();
        assert_eq!(v["list"], "<index><a>1</a></index>");
    }

    #[test]
    fn parse_rejects_broken_documents() {
        assert!(matches!(parse_document("<a><b></a>"), Err(CisError::Malformed(_))));
        assert!(matches!(parse_document("<a>"), Err(CisError::Malformed(_))));
        assert!(matches!(parse_document(""), Err(CisError::Malformed(_))));
        assert!(matches!(parse_document("<a/><b/>"), Err(CisError::Malformed(_))));
    }

    #[test]
    fn one_or_many_collapses_to_vec() {
        assert_eq!(OneOrMany::from_value(Value::Null), None);
        let one = OneOrMany::from_value(json!({ "a": 1 })).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one.into_vec(), vec![json!({ "a": 1 })]);
        let many = OneOrMany::from_value(json!([1, 2])).unwrap();
        assert_eq!(many.into_vec(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn unescape_angles_only_touches_lt_gt() {
        assert_eq!(unescape_angles("&lt;a&gt;&amp;&lt;/a&gt;"), "<a>&amp;</a>");
    }
}
