//! Response decoding: envelope parsing, fault mapping and typed extraction.
//!
//! Responses are parsed into a small element tree (local names only, text
//! unescaped). The return value of an RPC call is the first child of the
//! `<{operation}Response>` element in the body.

use hera::{CacheContent, CacheEntry, GlobalCacheInfo, RemoteError, RemoteErrorKind};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::description::{attribute, local_name};

/// Why a response body could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("missing element <{0}>")]
    Missing(&'static str),

    #[error("unexpected value '{value}' for {field}")]
    BadValue { field: String, value: String },
}

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub nil: bool,
    pub children: Vec<Element>,
}

impl Element {
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Parses an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    let malformed = |e: &dyn std::fmt::Display| DecodeError::Malformed(e.to_string());

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Element {
                name: local_name(&start),
                nil: is_nil(attribute(&start, "nil")),
                ..Element::default()
            }),
            Ok(Event::Empty(start)) => {
                let element = Element {
                    name: local_name(&start),
                    nil: is_nil(attribute(&start, "nil")),
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| malformed(&e))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DecodeError::Malformed("unbalanced end tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&e)),
        }
    }

    if !stack.is_empty() {
        return Err(DecodeError::Malformed("unexpected end of document".into()));
    }
    root.ok_or(DecodeError::Missing("Envelope"))
}

fn is_nil(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("true") | Some("1"))
}

/// Outcome of reading a response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The operation's return value (absent for void operations).
    Return(Option<Element>),
    /// A SOAP fault.
    Fault { code: String, message: String },
}

/// Reads the body of a response envelope.
pub fn read_envelope(xml: &str) -> Result<Reply, DecodeError> {
    let envelope = parse_document(xml)?;
    if envelope.name != "Envelope" {
        return Err(DecodeError::Missing("Envelope"));
    }
    let body = envelope.child("Body").ok_or(DecodeError::Missing("Body"))?;
    let Some(payload) = body.children.first() else {
        return Ok(Reply::Return(None));
    };

    if payload.name == "Fault" {
        return Ok(fault(payload));
    }
    Ok(Reply::Return(payload.children.first().cloned()))
}

/// Reads a SOAP 1.1 (`faultcode`/`faultstring`) or SOAP 1.2
/// (`Code/Value`, `Reason/Text`) fault.
fn fault(element: &Element) -> Reply {
    let text = |e: Option<&Element>| e.map(|e| e.trimmed().to_string()).unwrap_or_default();

    let (code, message) = if element.child("faultcode").is_some() {
        (
            text(element.child("faultcode")),
            text(element.child("faultstring")),
        )
    } else {
        (
            text(element.child("Code").and_then(|c| c.child("Value"))),
            text(element.child("Reason").and_then(|r| r.child("Text"))),
        )
    };
    Reply::Fault { code, message }
}

/// Wraps a decode failure for `operation` into a remote error.
pub fn invalid_response(operation: &str, error: DecodeError) -> RemoteError {
    RemoteError::new(operation, RemoteErrorKind::InvalidResponse, error.to_string())
}

// ---------------------------------------------------------------------------
// Typed extraction
// ---------------------------------------------------------------------------

/// Items of an array value; a missing or nil value reads as empty.
fn items(value: Option<&Element>) -> &[Element] {
    match value {
        Some(element) if !element.nil => &element.children,
        _ => &[],
    }
}

pub fn string_list(value: Option<&Element>) -> Vec<String> {
    items(value).iter().map(|item| item.trimmed().to_string()).collect()
}

pub fn nested_string_list(value: Option<&Element>) -> Vec<Vec<String>> {
    items(value).iter().map(|group| string_list(Some(group))).collect()
}

fn parse_field<T: std::str::FromStr>(field: &str, text: &str) -> Result<T, DecodeError> {
    text.parse().map_err(|_| DecodeError::BadValue {
        field: field.to_string(),
        value: text.to_string(),
    })
}

pub fn u64_list(value: Option<&Element>) -> Result<Vec<u64>, DecodeError> {
    items(value)
        .iter()
        .map(|item| parse_field("item", item.trimmed()))
        .collect()
}

pub fn bool_list(value: Option<&Element>) -> Result<Vec<bool>, DecodeError> {
    items(value)
        .iter()
        .map(|item| match item.trimmed() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(DecodeError::BadValue {
                field: "item".into(),
                value: other.to_string(),
            }),
        })
        .collect()
}

/// A numeric struct field; absent or nil fields read as the type's default.
fn number<T: std::str::FromStr + Default>(parent: &Element, field: &str) -> Result<T, DecodeError> {
    match parent.child(field) {
        Some(value) if !value.nil && !value.trimmed().is_empty() => parse_field(field, value.trimmed()),
        _ => Ok(T::default()),
    }
}

fn text_field(parent: &Element, field: &str) -> String {
    parent
        .child(field)
        .map(|value| value.trimmed().to_string())
        .unwrap_or_default()
}

pub fn global_cache_info(value: Option<&Element>) -> Result<GlobalCacheInfo, DecodeError> {
    let info = value.ok_or(DecodeError::Missing("return"))?;
    Ok(GlobalCacheInfo {
        entries: number(info, "entries")?,
        max_entries: number(info, "max_entries")?,
        memory_used: number(info, "memory_used")?,
        total_memory: number(info, "total_memory")?,
        hit_rate: number(info, "hit_rate")?,
        hits: number(info, "hits")?,
        misses: number(info, "misses")?,
    })
}

fn cache_entry(item: &Element) -> Result<CacheEntry, DecodeError> {
    Ok(CacheEntry {
        protocol: text_field(item, "protocol"),
        host: text_field(item, "host"),
        path: text_field(item, "path"),
        size: number(item, "size")?,
        expiry_time: number(item, "expiry_time")?,
    })
}

pub fn cache_content(value: Option<&Element>) -> Result<CacheContent, DecodeError> {
    let content = value.ok_or(DecodeError::Missing("return"))?;
    Ok(CacheContent {
        number_matching_items: number(content, "number_matching_items")?,
        matching_items: items(content.child("matching_items"))
            .iter()
            .map(cache_entry)
            .collect::<Result<_, _>>()?,
    })
}
