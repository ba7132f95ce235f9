//! XML Event Types
//!
//! Event types for pull-parser style XML processing. Every event carries the
//! byte offset of its markup so the tree builder can report well-formedness
//! errors it detects (tag mismatches, undeclared prefixes) at the right spot.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// XML declaration: `<?xml version="1.0"?>`, pseudo-attributes as written
    XmlDeclaration { content: &'a str },
    /// Start of an element: `<name attrs...>` or `<name attrs.../>`
    StartElement(StartElement<'a>),
    /// End of an element: `</name>`
    EndElement { name: &'a str },
    /// Text content between tags, references decoded
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(Cow<'a, str>),
    /// Comment content
    Comment(Cow<'a, str>),
    /// Processing instruction: `<?target content?>`
    ProcessingInstruction { target: &'a str, content: Cow<'a, str> },
    /// DOCTYPE declaration, everything between `<!` and the closing `>`
    DocType(&'a str),
}

/// Start element event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement<'a> {
    /// Qualified element name as written
    pub name: &'a str,
    /// Attributes in document order, namespace declarations included
    pub attributes: Vec<Attribute<'a>>,
    /// `<name/>` form
    pub is_empty: bool,
}

/// Event plus the byte offset of its first character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positioned<'a> {
    pub offset: usize,
    pub event: XmlEvent<'a>,
}
