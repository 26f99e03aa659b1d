//! SOAP response rendering.
//!
//! [`SoapResponseBuilder`] renders either an operation result or a [`Fault`]
//! as a complete SOAP envelope.
//!
//! A successful result must be a JSON object; each key becomes a child of
//! `soap:Body`:
//!
//! ```text
//! {"AddResponse": {"result": 3}}
//! ```
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
//!   <soap:Body><AddResponse><result>3</result></AddResponse></soap:Body>
//! </soap:Envelope>
//! ```
//!
//! Within objects, keys starting with the attribute prefix (default `@_`)
//! become attributes, the `#text` key becomes text content, arrays become
//! repeated elements and `null` becomes an empty element.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesText, Event};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

use soapstack_model::Fault;

use crate::error::XmlError;

/// SOAP 1.1 envelope namespace.
pub const SOAP_11_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace.
pub const SOAP_12_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Key holding the text content of an object rendered as an element.
const TEXT_KEY: &str = "#text";

/// Returned when even the fault envelope cannot be written.
const GENERIC_FAULT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
    "<soap:Body><soap:Fault><faultcode>soap:Server</faultcode>",
    "<faultstring>Internal Server Error</faultstring></soap:Fault></soap:Body>",
    "</soap:Envelope>",
);

/// Renders a result value or a fault into a SOAP XML body.
pub trait ResponseBuilder: Send + Sync + 'static {
    /// Render a successful operation result.
    fn success(&self, value: &Value) -> Result<String, Fault>;

    /// Render a fault. Always produces a non-empty XML document.
    fn fault(&self, fault: &Fault) -> String;
}

/// SOAP protocol version used for rendered envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoapVersion {
    /// SOAP 1.1
    #[default]
    #[serde(rename = "1.1")]
    Soap11,
    /// SOAP 1.2
    #[serde(rename = "1.2")]
    Soap12,
}

impl SoapVersion {
    /// The envelope namespace URI for this version.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_NAMESPACE,
            Self::Soap12 => SOAP_12_NAMESPACE,
        }
    }
}

/// Options for [`SoapResponseBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseBuilderOptions {
    /// SOAP version of rendered envelopes.
    #[builder(default)]
    pub version: SoapVersion,

    /// Object keys with this prefix are written as attributes.
    #[builder(default = String::from("@_"), setter(into))]
    pub attribute_prefix: String,

    /// Indent nested elements by two spaces.
    #[builder(default = false)]
    pub indent: bool,
}

impl Default for ResponseBuilderOptions {
    fn default() -> Self {
        Self {
            version: SoapVersion::default(),
            attribute_prefix: String::from("@_"),
            indent: false,
        }
    }
}

/// The default SOAP envelope renderer.
#[derive(Debug, Clone, Default)]
pub struct SoapResponseBuilder {
    options: ResponseBuilderOptions,
}

impl SoapResponseBuilder {
    /// Create a builder with the given options.
    #[must_use]
    pub fn new(options: ResponseBuilderOptions) -> Self {
        Self { options }
    }

    /// The options this builder was built with.
    #[must_use]
    pub fn options(&self) -> &ResponseBuilderOptions {
        &self.options
    }

    /// Render a result value as a success envelope.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the value is not an object or contains a key
    /// that is not a valid XML name.
    pub fn render_success(&self, value: &Value) -> Result<String, XmlError> {
        let Value::Object(entries) = value else {
            return Err(XmlError::UnexpectedElement(format!(
                "response payload must be an object, got {}",
                json_type(value)
            )));
        };
        for (key, child) in entries {
            check_name(key)?;
            self.check_names(child)?;
        }

        self.envelope(|w| {
            for (key, child) in entries {
                self.write_value(w, key, child)?;
            }
            Ok(())
        })
    }

    /// Render a fault envelope.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if writing fails.
    pub fn render_fault(&self, fault: &Fault) -> Result<String, XmlError> {
        let status = fault.status_code.as_u16().to_string();
        match self.options.version {
            SoapVersion::Soap11 => self.envelope(|w| {
                w.create_element("soap:Fault").write_inner_content(|w| {
                    w.create_element("faultcode")
                        .write_text_content(text_node(&format!(
                            "soap:{}",
                            fault.fault_code()
                        )))?;
                    w.create_element("faultstring")
                        .write_text_content(text_node(&fault.message))?;
                    w.create_element("detail").write_inner_content(|w| {
                        w.create_element("statusCode")
                            .write_text_content(text_node(&status))?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            }),
            SoapVersion::Soap12 => self.envelope(|w| {
                let code = if fault.status_code.is_client_error() {
                    "soap:Sender"
                } else {
                    "soap:Receiver"
                };
                w.create_element("soap:Fault").write_inner_content(|w| {
                    w.create_element("soap:Code").write_inner_content(|w| {
                        w.create_element("soap:Value")
                            .write_text_content(text_node(code))?;
                        Ok(())
                    })?;
                    w.create_element("soap:Reason").write_inner_content(|w| {
                        w.create_element("soap:Text")
                            .with_attribute(("xml:lang", "en"))
                            .write_text_content(text_node(&fault.message))?;
                        Ok(())
                    })?;
                    w.create_element("soap:Detail").write_inner_content(|w| {
                        w.create_element("statusCode")
                            .write_text_content(text_node(&status))?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            }),
        }
    }

    /// Write the declaration, `soap:Envelope` and `soap:Body`, delegating the
    /// body content to `body`.
    fn envelope<F>(&self, body: F) -> Result<String, XmlError>
    where
        F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
    {
        let mut buf = Vec::with_capacity(512);
        let mut writer = if self.options.indent {
            Writer::new_with_indent(&mut buf, b' ', 2)
        } else {
            Writer::new(&mut buf)
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer
            .create_element("soap:Envelope")
            .with_attribute(("xmlns:soap", self.options.version.namespace()))
            .write_inner_content(|w| {
                w.create_element("soap:Body").write_inner_content(body)?;
                Ok(())
            })?;

        String::from_utf8(buf).map_err(|err| XmlError::ParseError(err.to_string()))
    }

    /// Write `value` as one or more `<tag>` elements.
    fn write_value<W: Write>(&self, w: &mut Writer<W>, tag: &str, value: &Value) -> io::Result<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.write_value(w, tag, item)?;
                }
            }
            Value::Object(entries) => {
                let prefix = self.options.attribute_prefix.as_str();
                let attributes: Vec<(&str, String)> = entries
                    .iter()
                    .filter_map(|(key, v)| {
                        attribute_name(key, prefix)
                            .map(|name| (name, xml_chars(&text_of(v)).into_owned()))
                    })
                    .collect();
                let text = entries.get(TEXT_KEY).map(text_of);
                let children: Vec<(&String, &Value)> = entries
                    .iter()
                    .filter(|(key, _)| key.as_str() != TEXT_KEY && attribute_name(key, prefix).is_none())
                    .collect();

                let element = w.create_element(tag).with_attributes(
                    attributes.iter().map(|(name, v)| (*name, v.as_str())),
                );
                if children.is_empty() {
                    match text {
                        Some(text) => {
                            element.write_text_content(text_node(&text))?;
                        }
                        None => {
                            element.write_empty()?;
                        }
                    }
                } else {
                    element.write_inner_content(|w| {
                        if let Some(text) = &text {
                            w.write_event(Event::Text(text_node(text)))?;
                        }
                        for (key, child) in &children {
                            self.write_value(w, key, child)?;
                        }
                        Ok(())
                    })?;
                }
            }
            Value::Null => {
                w.create_element(tag).write_empty()?;
            }
            scalar => {
                w.create_element(tag)
                    .write_text_content(text_node(&text_of(scalar)))?;
            }
        }
        Ok(())
    }

    /// Validate every element and attribute name reachable from `value`.
    fn check_names(&self, value: &Value) -> Result<(), XmlError> {
        match value {
            Value::Array(items) => items.iter().try_for_each(|item| self.check_names(item)),
            Value::Object(entries) => {
                let prefix = self.options.attribute_prefix.as_str();
                for (key, child) in entries {
                    if key == TEXT_KEY {
                        continue;
                    }
                    match attribute_name(key, prefix) {
                        Some(name) => check_name(name)?,
                        None => {
                            check_name(key)?;
                            self.check_names(child)?;
                        }
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl ResponseBuilder for SoapResponseBuilder {
    fn success(&self, value: &Value) -> Result<String, Fault> {
        self.render_success(value).map_err(|err| {
            Fault::render_failure(format!("Failed to render SOAP response: {err}")).with_source(err)
        })
    }

    fn fault(&self, fault: &Fault) -> String {
        self.render_fault(fault).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialize SOAP fault");
            GENERIC_FAULT.to_owned()
        })
    }
}

/// The attribute name for `key`, if it carries the attribute prefix.
fn attribute_name<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    key.strip_prefix(prefix)
}

/// A text node escaping only `<`, `>` and `&`.
fn text_node(text: &str) -> BytesText<'_> {
    match xml_chars(text) {
        Cow::Borrowed(text) => BytesText::from_escaped(partial_escape(text)),
        Cow::Owned(text) => BytesText::from_escaped(partial_escape(&text).into_owned()),
    }
}

/// Replace characters XML 1.0 cannot carry with U+FFFD.
fn xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        )
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Text content for a scalar; containers render as their JSON text.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reject names that would produce malformed XML.
fn check_name(name: &str) -> Result<(), XmlError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(XmlError::InvalidName(name.to_owned()))
    }
}
