//! Structural XML validation for registered WSDL documents.
//!
//! Only well-formedness is checked: one root element, balanced and matching
//! tags, valid attributes and no stray text outside the root. The WSDL schema
//! itself is not validated.

use quick_xml::events::Event;

use crate::error::{XmlError, push_reference, push_text, reader};

/// Check that `xml` is a well-formed XML document.
///
/// # Errors
///
/// Returns `XmlError` describing the first structural problem found.
pub fn check_well_formed(xml: &str) -> Result<(), XmlError> {
    let mut reader = reader(xml);
    let mut depth: usize = 0;
    let mut roots: usize = 0;
    let mut outside = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return Err(XmlError::UnexpectedElement(
                            "multiple root elements".to_owned(),
                        ));
                    }
                }
                for attr in e.attributes() {
                    attr?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return Err(XmlError::UnexpectedElement(
                            "multiple root elements".to_owned(),
                        ));
                    }
                }
                for attr in e.attributes() {
                    attr?;
                }
            }
            Event::End(e) => {
                if depth == 0 {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(XmlError::UnexpectedElement(format!(
                        "closing tag </{name}> without opening tag"
                    )));
                }
                depth -= 1;
            }
            Event::Text(e) if depth == 0 => push_text(&mut outside, &e)?,
            Event::GeneralRef(e) if depth == 0 => push_reference(&mut outside, &e)?,
            Event::CData(_) if depth == 0 => {
                return Err(XmlError::UnexpectedElement(
                    "CDATA outside the root element".to_owned(),
                ));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and content
            // inside the root need no further checks.
            _ => {}
        }

        if !outside.trim().is_empty() {
            return Err(XmlError::UnexpectedElement(
                "text outside the root element".to_owned(),
            ));
        }
    }

    if depth > 0 {
        return Err(XmlError::MissingElement(format!(
            "{depth} unclosed element(s) at end of document"
        )));
    }
    if roots == 0 {
        return Err(XmlError::MissingElement("root element".to_owned()));
    }
    Ok(())
}
