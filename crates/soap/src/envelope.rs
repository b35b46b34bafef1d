//! Request envelopes (RPC/encoded style).

use std::fmt::Write as _;

use hera::ApiVersion;
use quick_xml::escape::escape;

const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const SOAP_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// SOAP protocol version used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    /// Control-API 1.2 speaks SOAP 1.2; every other version speaks SOAP 1.1.
    pub fn for_api(version: ApiVersion) -> Self {
        if version == ApiVersion::new(1, 2) {
            SoapVersion::Soap12
        } else {
            SoapVersion::Soap11
        }
    }

    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP11_ENVELOPE_NS,
            SoapVersion::Soap12 => SOAP12_ENVELOPE_NS,
        }
    }

    /// `Content-Type` header for a request carrying `action`.
    pub fn content_type(self, action: &str) -> String {
        match self {
            SoapVersion::Soap11 => "text/xml; charset=utf-8".to_string(),
            SoapVersion::Soap12 => format!("application/soap+xml; charset=utf-8; action=\"{action}\""),
        }
    }

    /// Value of the separate `SOAPAction` header (SOAP 1.1 only).
    pub fn soap_action_header(self, action: &str) -> Option<String> {
        match self {
            SoapVersion::Soap11 => Some(format!("\"{action}\"")),
            SoapVersion::Soap12 => None,
        }
    }
}

/// A request parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    StringArray(Vec<String>),
    StringArrayArray(Vec<Vec<String>>),
    Nil,
}

impl Value {
    pub fn strings<T: AsRef<str>>(items: &[T]) -> Self {
        Value::StringArray(items.iter().map(|s| s.as_ref().to_string()).collect())
    }

    pub fn nested_strings<T: AsRef<str>>(groups: &[Vec<T>]) -> Self {
        Value::StringArrayArray(
            groups
                .iter()
                .map(|group| group.iter().map(|s| s.as_ref().to_string()).collect())
                .collect(),
        )
    }
}

/// Builds the envelope for calling `operation` in `namespace`.
pub fn request(
    version: SoapVersion,
    namespace: &str,
    operation: &str,
    params: &[(String, Value)],
) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = write!(
        out,
        r#"<env:Envelope xmlns:env="{env}" xmlns:xsi="{XSI_NS}" xmlns:xsd="{XSD_NS}" xmlns:soapenc="{SOAP_ENCODING_NS}">"#,
        env = version.envelope_namespace(),
    );
    out.push_str("<env:Body>");
    let _ = write!(
        out,
        r#"<ns:{operation} xmlns:ns="{ns}" env:encodingStyle="{SOAP_ENCODING_NS}">"#,
        ns = escape(namespace),
    );
    for (name, value) in params {
        write_value(&mut out, name, value);
    }
    let _ = write!(out, "</ns:{operation}>");
    out.push_str("</env:Body></env:Envelope>");
    out
}

fn write_value(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::String(s) => {
            let _ = write!(out, r#"<{name} xsi:type="xsd:string">{}</{name}>"#, escape(s.as_str()));
        }
        Value::Int(n) => {
            let _ = write!(out, r#"<{name} xsi:type="xsd:int">{n}</{name}>"#);
        }
        Value::StringArray(items) => {
            let _ = write!(
                out,
                r#"<{name} xsi:type="soapenc:Array" soapenc:arrayType="xsd:string[{}]">"#,
                items.len()
            );
            for item in items {
                write_value(out, "item", &Value::String(item.clone()));
            }
            let _ = write!(out, "</{name}>");
        }
        Value::StringArrayArray(groups) => {
            let _ = write!(
                out,
                r#"<{name} xsi:type="soapenc:Array" soapenc:arrayType="xsd:string[][{}]">"#,
                groups.len()
            );
            for group in groups {
                write_value(out, "item", &Value::StringArray(group.clone()));
            }
            let _ = write!(out, "</{name}>");
        }
        Value::Nil => {
            let _ = write!(out, r#"<{name} xsi:nil="true"/>"#);
        }
    }
}
