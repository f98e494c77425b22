// SOAP request encoding
//
// `encode_request` is a pure function of the configuration and the operation
// parameters; it never touches the network.
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::operations::SoapOperation;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::Serialize;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const COMARCH_NS: &str = "http://interfaces.esb.clm.comarch.com/";

const REDACTED: &str = "***";

#[derive(Debug, Serialize)]
struct RequestContext<'a> {
    #[serde(rename = "langCode")]
    lang_code: &'a str,
    #[serde(rename = "clientLogin")]
    client_login: &'a str,
    #[serde(rename = "clientPass")]
    client_pass: &'a str,
}

#[derive(Debug, Serialize)]
struct MethodCall<'a, O> {
    context: RequestContext<'a>,
    data: &'a O,
}

fn write_event<'a>(writer: &mut Writer<Vec<u8>>, event: Event<'a>) -> Result<(), ApiError> {
    writer
        .write_event(event)
        .map_err(|e| ApiError::EncodingError(e.to_string()))
}

// Build the full envelope:
// Envelope / Body / int:{method} / {method} / (context, data)
pub fn encode_request<O: SoapOperation>(config: &ClientConfig, operation: &O) -> Result<String, ApiError> {
    let call = MethodCall {
        context: RequestContext {
            lang_code: &config.lang_code,
            client_login: &config.username,
            client_pass: &config.password,
        },
        data: operation,
    };
    let payload = quick_xml::se::to_string_with_root(O::METHOD, &call)
        .map_err(|e| ApiError::EncodingError(e.to_string()))?;

    let wrapper = format!("int:{}", O::METHOD);
    let mut writer = Writer::new(Vec::with_capacity(payload.len() + 256));

    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write_event(
        &mut writer,
        Event::Start(
            BytesStart::new("soapenv:Envelope")
                .with_attributes([("xmlns:soapenv", SOAP_ENV_NS), ("xmlns:int", COMARCH_NS)]),
        ),
    )?;
    write_event(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
    write_event(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;
    write_event(&mut writer, Event::Start(BytesStart::new(wrapper.as_str())))?;
    // Already serialized and escaped
    writer.get_mut().extend_from_slice(payload.as_bytes());
    write_event(&mut writer, Event::End(BytesEnd::new(wrapper.as_str())))?;
    write_event(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| ApiError::EncodingError(e.to_string()))
}

// Re-indent a document for log output
pub fn prettify_xml(xml: &str) -> Result<String, ApiError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    // Only whitespace between tags is replaced, text keeps its spaces
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {}
            // Written as text so the indenter does not break lines around it
            Ok(Event::GeneralRef(r)) => {
                let raw = format!("&{};", String::from_utf8_lossy(&r));
                write_event(&mut writer, Event::Text(BytesText::from_escaped(raw)))?
            }
            Ok(event) => write_event(&mut writer, event)?,
            Err(e) => {
                return Err(ApiError::XmlParseError(format!(
                    "Error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| ApiError::XmlParseError(e.to_string()))
}

// Hide the password before a request body goes anywhere near a log
pub fn redact_credentials(xml: &str) -> String {
    const OPEN: &str = "<clientPass>";
    const CLOSE: &str = "</clientPass>";

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let content_start = start + OPEN.len();
        match rest[content_start..].find(CLOSE) {
            Some(len) => {
                out.push_str(&rest[..content_start]);
                out.push_str(REDACTED);
                rest = &rest[content_start + len..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
