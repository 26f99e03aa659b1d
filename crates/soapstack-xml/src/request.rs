//! SOAP request parsing.
//!
//! [`SoapRequestParser`] turns a SOAP envelope into an [`OperationDescriptor`]:
//!
//! ```xml
//! <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
//!   <soap:Body>
//!     <m:Add xmlns:m="urn:calculator">   <!-- operation -->
//!       <m:a>1</m:a>                    <!-- input 0 -->
//!       <m:b>2</m:b>                    <!-- input 1 -->
//!     </m:Add>
//!   </soap:Body>
//! </soap:Envelope>
//! ```
//!
//! Leaf inputs become strings (or numbers and booleans when scalar coercion is
//! enabled), nested inputs become objects, and repeated sibling names become
//! arrays.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;

use soapstack_model::{Fault, OperationDescriptor, OperationInput};

use crate::error::{XmlError, local_name, push_reference, push_text, reader};

/// Converts a raw request body into an operation descriptor.
///
/// Parse failures are reported as a [`Fault`] whose status the dispatcher
/// passes through unchanged.
pub trait RequestParser: Send + Sync + 'static {
    /// Parse a request body.
    fn parse(&self, body: &str) -> Result<OperationDescriptor, Fault>;
}

/// Options for [`SoapRequestParser`].
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestParserOptions {
    /// Convert leaf text that looks like a JSON number or boolean into one.
    ///
    /// Coercion keeps the value, not the spelling: `1.50` becomes `1.5`.
    /// Turn this off when inputs such as codes must keep their exact text.
    #[builder(default = true)]
    pub coerce_scalars: bool,

    /// Maximum element nesting depth, counted from the envelope root.
    #[builder(default = 64)]
    pub max_depth: usize,
}

impl Default for RequestParserOptions {
    fn default() -> Self {
        Self {
            coerce_scalars: true,
            max_depth: 64,
        }
    }
}

/// The default SOAP 1.1/1.2 envelope parser.
#[derive(Debug, Clone, Default)]
pub struct SoapRequestParser {
    options: RequestParserOptions,
}

impl SoapRequestParser {
    /// Create a parser with the given options.
    #[must_use]
    pub fn new(options: RequestParserOptions) -> Self {
        Self { options }
    }

    /// The options this parser was built with.
    #[must_use]
    pub fn options(&self) -> &RequestParserOptions {
        &self.options
    }

    fn parse_envelope(&self, body: &str) -> Result<Option<OperationDescriptor>, XmlError> {
        let mut reader = reader(body);

        let root = loop {
            match reader.read_event()? {
                Event::Start(e) => break e,
                Event::Empty(e) => {
                    return Err(missing_for_empty_root(&e));
                }
                Event::DocType(_) => return Err(XmlError::DoctypeNotAllowed),
                Event::Text(e) => {
                    let mut text = String::new();
                    push_text(&mut text, &e)?;
                    if !text.trim().is_empty() {
                        return Err(XmlError::UnexpectedElement(
                            "text before the SOAP Envelope".to_owned(),
                        ));
                    }
                }
                Event::Eof => return Err(XmlError::MissingElement("Envelope".to_owned())),
                _ => {}
            }
        };
        if local_name(root.local_name().as_ref())? != "Envelope" {
            return Err(XmlError::MissingElement("Envelope".to_owned()));
        }

        let descriptor = loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if local_name(e.local_name().as_ref())? == "Body" {
                        break self.read_body(&mut reader)?;
                    }
                    skip_element(&mut reader)?;
                }
                Event::Empty(e) => {
                    if local_name(e.local_name().as_ref())? == "Body" {
                        break None;
                    }
                }
                Event::End(_) => return Err(XmlError::MissingElement("Body".to_owned())),
                Event::DocType(_) => return Err(XmlError::DoctypeNotAllowed),
                Event::Eof => {
                    return Err(XmlError::MissingElement(
                        "closing tag of Envelope".to_owned(),
                    ));
                }
                _ => {}
            }
        };

        drain(&mut reader)?;
        Ok(descriptor)
    }

    /// Read the operation element inside `Body`, consuming through `</Body>`.
    fn read_body(&self, reader: &mut Reader<&[u8]>) -> Result<Option<OperationDescriptor>, XmlError> {
        let mut descriptor = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) if descriptor.is_none() => {
                    let operation = local_name(e.local_name().as_ref())?;
                    let mut op = OperationDescriptor::new(operation);
                    self.read_inputs(reader, &mut op)?;
                    descriptor = Some(op);
                }
                Event::Empty(e) if descriptor.is_none() => {
                    let operation = local_name(e.local_name().as_ref())?;
                    descriptor = Some(OperationDescriptor::new(operation));
                }
                Event::Start(_) => skip_element(reader)?,
                Event::End(_) => return Ok(descriptor),
                Event::Eof => {
                    return Err(XmlError::MissingElement("closing tag of Body".to_owned()));
                }
                _ => {}
            }
        }
    }

    /// Read the children of the operation element as ordered inputs.
    fn read_inputs(
        &self,
        reader: &mut Reader<&[u8]>,
        op: &mut OperationDescriptor,
    ) -> Result<(), XmlError> {
        // Envelope, Body and the operation element are already open.
        let depth = 3;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = local_name(e.local_name().as_ref())?;
                    let value = self.read_value(reader, depth + 1)?;
                    op.inputs.push(OperationInput { name, value });
                }
                Event::Empty(e) => {
                    let name = local_name(e.local_name().as_ref())?;
                    op.inputs.push(OperationInput {
                        name,
                        value: Value::String(String::new()),
                    });
                }
                Event::End(_) => return Ok(()),
                Event::Eof => {
                    return Err(XmlError::MissingElement(format!(
                        "closing tag of {}",
                        op.operation
                    )));
                }
                _ => {}
            }
        }
    }

    /// Read the content of an open element into a JSON value.
    fn read_value(&self, reader: &mut Reader<&[u8]>, depth: usize) -> Result<Value, XmlError> {
        if depth > self.options.max_depth {
            return Err(XmlError::DepthExceeded(self.options.max_depth));
        }

        let mut text = String::new();
        let mut children: Map<String, Value> = Map::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = local_name(e.local_name().as_ref())?;
                    let value = self.read_value(reader, depth + 1)?;
                    insert_child(&mut children, name, value);
                }
                Event::Empty(e) => {
                    let name = local_name(e.local_name().as_ref())?;
                    insert_child(&mut children, name, Value::String(String::new()));
                }
                Event::Text(e) => push_text(&mut text, &e)?,
                Event::GeneralRef(e) => push_reference(&mut text, &e)?,
                Event::CData(e) => {
                    let data = std::str::from_utf8(&e)
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    text.push_str(data);
                }
                Event::End(_) => break,
                Event::Eof => {
                    return Err(XmlError::UnexpectedElement(
                        "unexpected EOF while reading element content".to_owned(),
                    ));
                }
                _ => {}
            }
        }

        if children.is_empty() {
            Ok(self.scalar(text.trim()))
        } else {
            Ok(Value::Object(children))
        }
    }

    fn scalar(&self, text: &str) -> Value {
        if self.options.coerce_scalars {
            match text {
                "true" => return Value::Bool(true),
                "false" => return Value::Bool(false),
                _ => {}
            }
            if let Ok(number) = serde_json::from_str::<serde_json::Number>(text) {
                return Value::Number(number);
            }
        }
        Value::String(text.to_owned())
    }
}

impl RequestParser for SoapRequestParser {
    fn parse(&self, body: &str) -> Result<OperationDescriptor, Fault> {
        if body.trim().is_empty() {
            return Err(Fault::parse_failure("Empty SOAP request"));
        }

        match self.parse_envelope(body) {
            Ok(Some(descriptor)) => Ok(descriptor),
            Ok(None) => Err(Fault::parse_failure("No operation found in SOAP body")),
            Err(XmlError::DoctypeNotAllowed) => Err(Fault::parse_failure(
                "DOCTYPE declarations are not allowed",
            )),
            Err(err) => {
                tracing::debug!(error = %err, "failed to parse SOAP request");
                Err(Fault::parse_failure(format!("Malformed SOAP request: {err}")).with_source(err))
            }
        }
    }
}

/// The error for a document whose root is a self-closing element.
fn missing_for_empty_root(root: &BytesStart<'_>) -> XmlError {
    if root.local_name().as_ref() == b"Envelope" {
        XmlError::MissingElement("Body".to_owned())
    } else {
        XmlError::MissingElement("Envelope".to_owned())
    }
}

/// Insert a child value, collecting repeated names into an array.
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Consume the rest of the document so trailing syntax errors surface.
fn drain(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    loop {
        match reader.read_event()? {
            Event::Eof => return Ok(()),
            Event::DocType(_) => return Err(XmlError::DoctypeNotAllowed),
            _ => {}
        }
    }
}
