//! XML processing errors and shared text-reading helpers.

use std::io;

use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesText};

/// Errors that can occur while reading or writing SOAP XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// An error from quick-xml attribute handling.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// An unexpected XML element was encountered.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// Text or a reference could not be decoded.
    #[error("failed to parse value: {0}")]
    ParseError(String),

    /// The document declares a DOCTYPE.
    #[error("DOCTYPE declarations are not allowed")]
    DoctypeNotAllowed,

    /// Elements are nested deeper than the configured limit.
    #[error("element nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),

    /// A name cannot be used as an XML element or attribute name.
    #[error("invalid XML name: {0:?}")]
    InvalidName(String),
}

/// Decode a text event into `out`.
pub(crate) fn push_text(out: &mut String, text: &BytesText<'_>) -> Result<(), XmlError> {
    let decoded = text
        .decode()
        .map_err(|err| XmlError::ParseError(err.to_string()))?;
    let unescaped = quick_xml::escape::unescape(&decoded)
        .map_err(|err| XmlError::ParseError(err.to_string()))?;
    out.push_str(&unescaped);
    Ok(())
}

/// Resolve a character or predefined entity reference into `out`.
///
/// Only the five predefined XML entities and numeric character references are
/// accepted; custom entities are never expanded.
pub(crate) fn push_reference(out: &mut String, reference: &BytesRef<'_>) -> Result<(), XmlError> {
    if let Some(ch) = reference.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    let name = reference
        .decode()
        .map_err(|err| XmlError::ParseError(err.to_string()))?;
    let resolved = quick_xml::escape::resolve_predefined_entity(&name)
        .ok_or_else(|| XmlError::ParseError(format!("unknown entity reference: &{name};")))?;
    out.push_str(resolved);
    Ok(())
}

/// Local name of an element as UTF-8.
pub(crate) fn local_name(name: &[u8]) -> Result<String, XmlError> {
    std::str::from_utf8(name)
        .map(ToOwned::to_owned)
        .map_err(|err| XmlError::ParseError(format!("element name is not UTF-8: {err}")))
}

/// Create a reader over `xml` with end-name checking enabled.
pub(crate) fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;
    reader
}
