// SOAP response decoding
//
// Responses are turned into a generic `XmlValue` tree instead of fixed structs:
// the service returns vendor specific payloads per method and callers pick the
// fields they need.
use crate::error::{ApiError, Fault};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const TEXT_KEY: &str = "#text";

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XmlValue {
    // Empty element
    Null,
    Text(String),
    Map(BTreeMap<String, XmlValue>),
    // Repeated sibling elements, in document order
    List(Vec<XmlValue>),
}

impl XmlValue {
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn path(&self, keys: &[&str]) -> Option<&XmlValue> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    // Text content, also for elements that carry attributes
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Text(text) => Some(text),
            XmlValue::Map(map) => map.get(TEXT_KEY).and_then(XmlValue::as_text),
            _ => None,
        }
    }

    // Exact decimal, point totals must not go through f64
    pub fn as_decimal(&self) -> Option<Decimal> {
        self.as_text().and_then(|text| Decimal::from_str(text.trim()).ok())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, XmlValue::Null)
    }

    // A single child and a repeated child look different in XML-to-map form;
    // this flattens both into a list.
    pub fn items(&self) -> Vec<&XmlValue> {
        match self {
            XmlValue::List(items) => items.iter().collect(),
            XmlValue::Null => Vec::new(),
            other => vec![other],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn insert_child(map: &mut BTreeMap<String, XmlValue>, key: String, value: XmlValue) {
        match map.get_mut(&key) {
            Some(XmlValue::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, XmlValue::Null);
                *existing = XmlValue::List(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
}

// Element under construction
struct Frame {
    name: String,
    children: BTreeMap<String, XmlValue>,
    text: Vec<Piece>,
    // xsi:nil="true"
    nil: bool,
}

enum Piece {
    // Markup text and entity references, unescaped once the element closes
    Escaped(String),
    // CDATA content, taken as is
    Literal(String),
}

impl Frame {
    fn open(reader: &NsReader<&[u8]>, start: &BytesStart) -> Result<Self, ApiError> {
        let (children, nil) = attributes(reader, start)?;
        Ok(Self {
            name: local_name(start)?,
            children,
            text: Vec::new(),
            nil,
        })
    }

    fn push_escaped(&mut self, raw: &str) {
        match self.text.last_mut() {
            Some(Piece::Escaped(last)) => last.push_str(raw),
            _ => self.text.push(Piece::Escaped(raw.to_string())),
        }
    }

    fn push_literal(&mut self, content: &str) {
        self.text.push(Piece::Literal(content.to_string()));
    }

    // Whitespace is trimmed at the edges of markup text only, CDATA keeps its padding
    fn collect_text(&self) -> Result<String, ApiError> {
        let last = self.text.len().saturating_sub(1);
        let mut out = String::new();
        for (i, piece) in self.text.iter().enumerate() {
            match piece {
                Piece::Escaped(raw) => {
                    let mut raw = raw.as_str();
                    if i == 0 {
                        raw = raw.trim_start();
                    }
                    if i == last {
                        raw = raw.trim_end();
                    }
                    let text = unescape(raw).map_err(|e| {
                        ApiError::XmlParseError(format!("Bad escape in <{}>: {}", self.name, e))
                    })?;
                    out.push_str(&text);
                }
                Piece::Literal(content) => out.push_str(content),
            }
        }
        Ok(out)
    }

    fn close(self) -> Result<(String, XmlValue), ApiError> {
        if self.nil {
            return Ok((self.name, XmlValue::Null));
        }
        let text = self.collect_text()?;

        let value = if self.children.is_empty() {
            if text.is_empty() {
                XmlValue::Null
            } else {
                XmlValue::Text(text)
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert(TEXT_KEY.to_string(), XmlValue::Text(text));
            }
            XmlValue::Map(children)
        };
        Ok((self.name, value))
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, ApiError> {
    std::str::from_utf8(bytes).map_err(|e| ApiError::XmlParseError(format!("Invalid UTF-8: {}", e)))
}

// Namespace prefixes vary between deployments (soap:, S:, ns2:), so keys use local names
fn local_name(start: &BytesStart) -> Result<String, ApiError> {
    let local = start.local_name();
    Ok(utf8(local.as_ref())?.to_string())
}

fn is_xsi(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == XSI_NAMESPACE.as_bytes())
}

// Attributes as "@name" entries, plus whether the element is marked xsi:nil
fn attributes(
    reader: &NsReader<&[u8]>,
    start: &BytesStart,
) -> Result<(BTreeMap<String, XmlValue>, bool), ApiError> {
    let mut map = BTreeMap::new();
    let mut nil = false;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ApiError::XmlParseError(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| ApiError::XmlParseError(e.to_string()))?;
        let (ns, local) = reader.resolve_attribute(attr.key);
        let name = utf8(local.as_ref())?;
        if name == "nil" && is_xsi(&ns) {
            nil = matches!(value.trim(), "true" | "1");
            continue;
        }
        map.insert(format!("@{}", name), XmlValue::Text(value.into_owned()));
    }
    Ok((map, nil))
}

// Parse a whole document into (root local name, value)
pub fn parse_document(xml: &str) -> Result<(String, XmlValue), ApiError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, XmlValue)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ApiError::XmlParseError(format!("Error at position {}: {}", reader.error_position(), e))
        })?;

        match event {
            Event::Start(ref e) => {
                if root.is_some() {
                    return Err(ApiError::XmlParseError("Multiple root elements".to_string()));
                }
                stack.push(Frame::open(&reader, e)?);
            }
            Event::Empty(ref e) => {
                let (name, value) = Frame::open(&reader, e)?.close()?;
                match stack.last_mut() {
                    Some(parent) => XmlValue::insert_child(&mut parent.children, name, value),
                    None if root.is_none() => root = Some((name, value)),
                    None => return Err(ApiError::XmlParseError("Multiple root elements".to_string())),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ApiError::XmlParseError("Unbalanced end tag".to_string()))?;
                let (name, value) = frame.close()?;
                match stack.last_mut() {
                    Some(parent) => XmlValue::insert_child(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(ref t) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_escaped(utf8(t)?);
                } else if !utf8(t)?.trim().is_empty() {
                    return Err(ApiError::XmlParseError("Text outside of root element".to_string()));
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_escaped(&format!("&{};", utf8(r)?));
                }
            }
            Event::CData(ref c) => {
                if let Some(frame) = stack.last_mut() {
                    frame.push_literal(utf8(c)?);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ApiError::XmlParseError("Unexpected end of document".to_string()));
    }
    root.ok_or_else(|| ApiError::XmlParseError("Document has no root element".to_string()))
}

// Extract `Envelope/Body/{method}Response/return`, or the fault the body carries
pub fn decode_response(method: &str, xml: &str) -> Result<XmlValue, ApiError> {
    let (root, envelope) = parse_document(xml)?;
    if root != "Envelope" {
        return Err(ApiError::MissingRequiredField(format!(
            "Envelope (found <{}>)",
            root
        )));
    }

    let body = envelope
        .get("Body")
        .ok_or_else(|| ApiError::MissingRequiredField("Envelope/Body".to_string()))?;

    if let Some(fault) = body.get("Fault") {
        return Err(ApiError::Fault(decode_fault(fault)));
    }

    let response_tag = format!("{}Response", method);
    let response = body
        .get(&response_tag)
        .ok_or_else(|| ApiError::MissingRequiredField(format!("Body/{}", response_tag)))?;

    response
        .get("return")
        .cloned()
        .ok_or_else(|| ApiError::MissingRequiredField(format!("{}/return", response_tag)))
}

fn flatten_text(value: &XmlValue) -> Option<String> {
    match value {
        XmlValue::Null => None,
        XmlValue::Text(text) => Some(text.clone()),
        other => other.as_text().map(str::to_string).or_else(|| Some(other.to_json().to_string())),
    }
}

// SOAP 1.1: faultcode / faultstring / detail
// SOAP 1.2: Code/Value / Reason/Text / Detail
pub fn decode_fault(fault: &XmlValue) -> Fault {
    let code = fault
        .get("faultcode")
        .or_else(|| fault.path(&["Code", "Value"]))
        .and_then(XmlValue::as_text)
        .unwrap_or("Unknown");

    let message = fault
        .get("faultstring")
        .or_else(|| fault.path(&["Reason", "Text"]))
        .and_then(|reason| reason.items().into_iter().next())
        .and_then(XmlValue::as_text)
        .unwrap_or("");

    let detail = fault
        .get("detail")
        .or_else(|| fault.get("Detail"))
        .and_then(flatten_text);

    Fault {
        code: code.to_string(),
        message: message.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    const BALANCE_XML: &str = include_str!("../samples/get_balance_response.xml");
    const CUSTOMER_XML: &str = include_str!("../samples/get_customer_response.xml");
    const TRANSACTIONS_XML: &str = include_str!("../samples/get_transactions_response.xml");
    const FAULT_XML: &str = include_str!("../samples/soap_fault_response.xml");
    const FAULT_12_XML: &str = include_str!("../samples/soap12_fault_response.xml");

    #[test]
    fn test_parse_document_shapes() {
        let (root, value) = parse_document(
            r#"<r a="1" xmlns:x="urn:x"><x:item>one</x:item><item>two</item><empty/><mixed k="v">t</mixed></r>"#,
        )
        .unwrap();

        assert_eq!(root, "r");
        assert_eq!(value.get("@a"), Some(&XmlValue::Text("1".to_string())));
        assert!(value.get("@xmlns:x").is_none());
        assert_eq!(
            value.get("item"),
            Some(&XmlValue::List(vec![
                XmlValue::Text("one".to_string()),
                XmlValue::Text("two".to_string()),
            ]))
        );
        assert!(value.get("empty").unwrap().is_null());
        assert_eq!(value.path(&["mixed", "@k"]).and_then(XmlValue::as_text), Some("v"));
        assert_eq!(value.get("mixed").and_then(XmlValue::as_text), Some("t"));
    }

    #[test]
    fn test_entities_and_cdata() {
        let (_, value) = parse_document(
            "<r><a>Fish &amp; Chips &#169;</a><b><![CDATA[<raw> &amp;]]></b></r>",
        )
        .unwrap();
        assert_eq!(value.get("a").and_then(XmlValue::as_text), Some("Fish & Chips ©"));
        assert_eq!(value.get("b").and_then(XmlValue::as_text), Some("<raw> &amp;"));
    }

    #[test_case("<r><c><![CDATA[  padded  ]]></c></r>", "  padded  " ; "padding inside cdata")]
    #[test_case("<r><c>\n  <![CDATA[ x ]]>\n</c></r>", " x " ; "markup whitespace around cdata")]
    #[test_case("<r><c> a &lt; <![CDATA[ b ]]> c </c></r>", "a <  b  c" ; "mixed text and cdata")]
    fn test_cdata_whitespace(xml: &str, expected: &str) {
        let (_, value) = parse_document(xml).unwrap();
        assert_eq!(value.get("c"), Some(&XmlValue::Text(expected.to_string())));
    }

    #[test]
    fn test_xsi_nil() {
        let (_, value) = parse_document(
            r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:x="urn:other">
                <tier xsi:nil="true"/>
                <points xsi:nil="true">10</points>
                <level xsi:nil="false">GOLD</level>
                <other x:nil="true"/>
                <plain nil="true"/>
            </r>"#,
        )
        .unwrap();
        assert!(value.get("tier").unwrap().is_null());
        assert!(value.get("points").unwrap().is_null());
        assert_eq!(value.get("level").and_then(XmlValue::as_text), Some("GOLD"));
        assert_eq!(value.path(&["other", "@nil"]).and_then(XmlValue::as_text), Some("true"));
        assert_eq!(value.path(&["plain", "@nil"]).and_then(XmlValue::as_text), Some("true"));
    }

    #[test]
    fn test_malformed_documents() {
        for xml in ["", "<a><b></a>", "<a>", "not xml at all", "<a/><b/>"] {
            let err = parse_document(xml).unwrap_err();
            assert!(err.is_parse(), "{:?} gave {:?}", xml, err);
        }
    }

    #[test]
    fn test_decode_balance() {
        let value = decode_response("getBalance", BALANCE_XML).unwrap();
        assert_eq!(value.get("pointsBalance").and_then(XmlValue::as_decimal), Some(dec!(123456789.125)));
        assert_eq!(value.get("cardNo").and_then(XmlValue::as_text), Some("000000000"));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let first = decode_response("getCustomer", CUSTOMER_XML).unwrap();
        let second = decode_response("getCustomer", CUSTOMER_XML).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn test_decode_customer() {
        let value = decode_response("getCustomer", CUSTOMER_XML).unwrap();
        let customer = value.get("customer").unwrap();
        assert_eq!(customer.get("firstName").and_then(XmlValue::as_text), Some("Jane"));
        assert_eq!(customer.get("address").unwrap().items().len(), 2);
        assert_eq!(
            customer.path(&["commPrefs", "statementPreference"]).and_then(XmlValue::as_text),
            Some("E")
        );
    }

    #[test]
    fn test_decode_transactions_list() {
        let value = decode_response("getTransactions", TRANSACTIONS_XML).unwrap();
        let transactions = value.get("transaction").unwrap().items();
        assert_eq!(transactions.len(), 3);
        let points: Vec<Decimal> = transactions
            .iter()
            .filter_map(|t| t.get("points").and_then(XmlValue::as_decimal))
            .collect();
        assert_eq!(points, vec![dec!(1500), dec!(-250.5), dec!(0.001)]);
    }

    #[test]
    fn test_to_json() {
        let value = decode_response("getBalance", BALANCE_XML).unwrap();
        let json = value.to_json();
        assert_eq!(json["pointsBalance"], serde_json::json!("123456789.125"));
        assert_eq!(json["tier"], serde_json::Value::Null);
        assert_eq!(json["expiringPoints"], serde_json::Value::Null);
        assert!(value.get("expiringPoints").unwrap().is_null());
    }

    #[test]
    fn test_soap11_fault() {
        let err = decode_response("getBalance", FAULT_XML).unwrap_err();
        assert!(err.is_fault());
        let fault = err.fault().unwrap();
        assert_eq!(fault.code, "soap:Client");
        assert_eq!(fault.message, "Card 000000000 does not exist");
        assert_eq!(fault.detail.as_deref(), Some(r#"{"errorCode":"CARD_NOT_FOUND"}"#));
    }

    #[test]
    fn test_soap12_fault() {
        let err = decode_response("enroll", FAULT_12_XML).unwrap_err();
        let fault = err.fault().unwrap();
        assert_eq!(fault.code, "env:Sender");
        assert_eq!(fault.message, "Login already registered");
        assert_eq!(fault.detail, None);
    }

    #[test]
    fn test_missing_structure_is_parse_error() {
        let wrong_method = decode_response("getCustomer", BALANCE_XML).unwrap_err();
        assert!(matches!(wrong_method, ApiError::MissingRequiredField(ref f) if f == "Body/getCustomerResponse"));

        let not_envelope = decode_response("getBalance", "<html><body>502</body></html>").unwrap_err();
        assert!(not_envelope.is_parse());

        let no_body = decode_response(
            "getBalance",
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"/>"#,
        )
        .unwrap_err();
        assert!(no_body.is_parse());

        let no_return = decode_response(
            "mergeAccount",
            r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body><ns2:mergeAccountResponse xmlns:ns2="http://interfaces.esb.clm.comarch.com/"/></S:Body></S:Envelope>"#,
        )
        .unwrap_err();
        assert!(matches!(no_return, ApiError::MissingRequiredField(_)));
    }

    #[test]
    fn test_empty_return_is_null() {
        let value = decode_response(
            "mergeAccount",
            r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body><ns2:mergeAccountResponse xmlns:ns2="http://interfaces.esb.clm.comarch.com/"><return/></ns2:mergeAccountResponse></S:Body></S:Envelope>"#,
        )
        .unwrap();
        assert!(value.is_null());
    }
}
