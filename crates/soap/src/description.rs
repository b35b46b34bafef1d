//! Service descriptions (WSDL files).
//!
//! Only the parts needed to call RPC-style operations are read:
//!
//! - the `targetNamespace` of `<definitions>` (namespace of request elements),
//! - every `<portType>/<operation>` and the part names of its input message
//!   (parameter names, in order),
//! - the `soapAction` of each `<binding>/<operation>/<soap:operation>`,
//! - the `<service>/<port>/<soap:address location>` for diagnostics.
//!
//! Imports, XSD types and document/literal bindings are not interpreted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hera::{HeraError, HeraResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One operation declared by a description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationDescription {
    /// Part names of the input message, in declaration order.
    pub input_parts: Vec<String>,
    /// SOAP action from the binding, if declared.
    pub soap_action: Option<String>,
}

/// The callable surface of one module, read from its WSDL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    /// File the description was read from.
    pub location: PathBuf,
    /// Namespace request elements are qualified with.
    pub target_namespace: String,
    /// Address declared by the `<service>` element, if any. Calls always go
    /// to the configured endpoint instead.
    pub declared_address: Option<String>,
    operations: BTreeMap<String, OperationDescription>,
}

impl ServiceDescription {
    /// Reads and validates the description at `path`.
    ///
    /// # Errors
    ///
    /// [`HeraError::Configuration`] if the file cannot be read, is not
    /// well-formed XML, lacks a `targetNamespace`, or declares no operations.
    pub fn load(path: &Path) -> HeraResult<Self> {
        let xml = fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
        Self::parse(&xml, path)
    }

    /// Parses description text; `path` is used for error reporting.
    pub fn parse(xml: &str, path: &Path) -> HeraResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut parser = DescriptionParser::default();
        loop {
            match reader.read_event() {
                Ok(Event::Start(element)) => {
                    parser.element(&element);
                    parser.stack.push(local_name(&element));
                }
                Ok(Event::Empty(element)) => parser.element(&element),
                Ok(Event::End(_)) => {
                    parser.stack.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(invalid(
                        path,
                        format!("malformed XML at byte {}: {e}", reader.buffer_position()),
                    ))
                }
            }
        }

        parser.finish(path)
    }

    /// The operation named `name`, if declared.
    pub fn operation(&self, name: &str) -> Option<&OperationDescription> {
        self.operations.get(name)
    }

    /// Names of all declared operations, sorted.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> HeraError {
    HeraError::Configuration {
        path: path.to_path_buf(),
        reason: format!("invalid service description: {}", reason.into()),
    }
}

pub(crate) fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

pub(crate) fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|value| value.into_owned()))
}

/// Drops a `prefix:` from a qualified reference such as `tns:getNodesRequest`.
fn strip_prefix(reference: &str) -> &str {
    reference.rsplit(':').next().unwrap_or(reference)
}

#[derive(Default)]
struct DescriptionParser {
    stack: Vec<String>,
    root_seen: bool,
    root_is_definitions: bool,
    target_namespace: Option<String>,
    declared_address: Option<String>,
    /// message name -> part names
    messages: BTreeMap<String, Vec<String>>,
    /// operation name -> input message name
    inputs: BTreeMap<String, Option<String>>,
    actions: BTreeMap<String, String>,
    current_message: Option<String>,
    current_port_operation: Option<String>,
    current_binding_operation: Option<String>,
}

impl DescriptionParser {
    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn within(&self, ancestor: &str) -> bool {
        self.stack.iter().any(|name| name == ancestor)
    }

    fn element(&mut self, element: &BytesStart<'_>) {
        let name = local_name(element);

        if !self.root_seen {
            self.root_seen = true;
            self.root_is_definitions = name == "definitions";
            self.target_namespace = attribute(element, "targetNamespace");
            return;
        }

        match (name.as_str(), self.parent()) {
            ("message", Some("definitions")) => {
                let message = attribute(element, "name").unwrap_or_default();
                self.messages.entry(message.clone()).or_default();
                self.current_message = Some(message);
            }
            ("part", Some("message")) => {
                if let (Some(message), Some(part)) =
                    (self.current_message.as_ref(), attribute(element, "name"))
                {
                    self.messages.entry(message.clone()).or_default().push(part);
                }
            }
            ("operation", Some("portType")) => {
                let operation = attribute(element, "name").unwrap_or_default();
                self.inputs.entry(operation.clone()).or_insert(None);
                self.current_port_operation = Some(operation);
            }
            ("input", Some("operation")) if self.within("portType") => {
                if let (Some(operation), Some(message)) = (
                    self.current_port_operation.as_ref(),
                    attribute(element, "message"),
                ) {
                    self.inputs
                        .insert(operation.clone(), Some(strip_prefix(&message).to_string()));
                }
            }
            ("operation", Some("binding")) => {
                self.current_binding_operation = attribute(element, "name");
            }
            ("operation", Some("operation")) if self.within("binding") => {
                if let (Some(operation), Some(action)) = (
                    self.current_binding_operation.as_ref(),
                    attribute(element, "soapAction"),
                ) {
                    self.actions.insert(operation.clone(), action);
                }
            }
            ("address", Some("port")) if self.within("service") => {
                self.declared_address = attribute(element, "location");
            }
            _ => {}
        }
    }

    fn finish(mut self, path: &Path) -> HeraResult<ServiceDescription> {
        if !self.root_is_definitions {
            return Err(invalid(path, "root element is not <definitions>"));
        }
        let target_namespace = self
            .target_namespace
            .take()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| invalid(path, "missing targetNamespace"))?;

        let operations: BTreeMap<String, OperationDescription> = self
            .inputs
            .into_iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, input)| {
                let input_parts = input
                    .and_then(|message| self.messages.get(&message).cloned())
                    .unwrap_or_default();
                let soap_action = self.actions.get(&name).cloned();
                (
                    name,
                    OperationDescription {
                        input_parts,
                        soap_action,
                    },
                )
            })
            .collect();

        if operations.is_empty() {
            return Err(invalid(path, "no operations declared"));
        }

        Ok(ServiceDescription {
            location: path.to_path_buf(),
            target_namespace,
            declared_address: self.declared_address,
            operations,
        })
    }
}
