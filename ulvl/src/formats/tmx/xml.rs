//! Minimal XML element tree for TMX documents
//!
//! The map is small enough to hold in memory, and interpreting it is much
//! simpler on a tree than on the raw event stream.

use crate::error::{Error, Position, Result};
use crate::formats::Format;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::str::FromStr;

/// An XML element with its attributes, text content and children.
#[derive(Debug, Clone, Default)]
pub(super) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content.
    pub text: String,
    pub children: Vec<Element>,
    /// Byte offset of the start tag.
    pub offset: usize,
}

/// Parse a document and return its root element.
pub(super) fn parse_document(content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut node_stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let offset = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                node_stack.push(element_from(&e, offset)?);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from(&e, offset)?;
                attach(&mut node_stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                if let Some(completed) = node_stack.pop() {
                    attach(&mut node_stack, &mut root, completed);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| malformed(offset, format!("invalid text: {err}")))?;
                if let Some(current) = node_stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = node_stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(reader.buffer_position(), e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = node_stack.last() {
        return Err(malformed(
            open.offset,
            format!("<{}> is never closed", open.name),
        ));
    }
    root.ok_or_else(|| malformed(content.len(), "document has no root element"))
}

/// Hand a finished element to its parent, or make it the root.
fn attach(node_stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = node_stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        tracing::trace!("Ignoring extra top-level element <{}>", element.name);
    }
}

fn element_from(e: &BytesStart<'_>, offset: usize) -> Result<Element> {
    let mut element = Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        offset,
        ..Element::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(offset, format!("invalid attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| malformed(offset, format!("invalid value for '{key}': {err}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position::Offset(self.offset))
    }

    /// Parse an optional attribute.
    pub fn parse_attr<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.attr(key)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    Error::malformed(
                        Format::Tmx,
                        self.position(),
                        format!("invalid {key} '{raw}' on <{}>", self.name),
                    )
                })
            })
            .transpose()
    }

    /// Parse an attribute that must be present.
    pub fn require_attr<T: FromStr>(&self, key: &str) -> Result<T> {
        self.parse_attr(key)?.ok_or_else(|| {
            Error::malformed(
                Format::Tmx,
                self.position(),
                format!("<{}> is missing '{key}'", self.name),
            )
        })
    }

    /// Parse an optional `0`/`1` flag.
    pub fn flag_attr(&self, key: &str) -> Result<Option<bool>> {
        self.attr(key)
            .map(|raw| {
                parse_flag(raw).ok_or_else(|| {
                    Error::malformed(
                        Format::Tmx,
                        self.position(),
                        format!("invalid {key} '{raw}' on <{}>", self.name),
                    )
                })
            })
            .transpose()
    }

    /// Trace attributes that are not in `known`.
    pub fn trace_unknown_attributes(&self, known: &[&str]) {
        for (key, _) in &self.attributes {
            if !known.contains(&key.as_str()) {
                tracing::trace!("Ignoring unknown attribute '{key}' on <{}>", self.name);
            }
        }
    }
}

/// TMX writes booleans as `0`/`1`; custom properties use `true`/`false`.
pub(super) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn malformed(offset: usize, reason: impl Into<String>) -> Error {
    Error::malformed(Format::Tmx, Some(Position::Offset(offset)), reason)
}
