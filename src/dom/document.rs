//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes, attributes included
//! - NodeId indices for traversal, equal to document order
//! - String interning for names and character data
//!
//! The document owns everything it needs; the input can be dropped once
//! parsing returns.

use std::borrow::Cow;
use std::fmt;

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::{StringPool, EMPTY};
use super::{node_string_value, DocumentAccess};
use crate::core::attributes::Attribute;
use crate::core::chars::{is_ncname, is_whitespace, split_qname};
use crate::core::encoding;
use crate::error::{ParseError, ParseErrorKind};
use crate::reader::{Positioned, SliceReader, StartElement, XmlEvent};

/// An XML document stored in arena format
#[derive(Debug)]
pub struct XmlDocument {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<XmlNode>,
    /// Interned strings
    strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
}

impl XmlDocument {
    /// Parse XML bytes (UTF-8, or UTF-16 with BOM) into a document
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let utf8 = encoding::to_utf8(input).map_err(|kind| ParseError::at(input, 0, kind))?;
        let text = std::str::from_utf8(&utf8)
            .map_err(|e| ParseError::at(&utf8, e.valid_up_to(), ParseErrorKind::InvalidUtf8))?;
        Self::parse_str(text)
    }

    /// Parse an XML string into a document
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        let doc = TreeBuilder::new().build(SliceReader::new(input))?;
        tracing::debug!(nodes = doc.nodes.len(), bytes = input.len(), "parsed XML document");
        Ok(doc)
    }

    /// The document node
    pub fn document(&self) -> Node<'_> {
        Node { doc: self, id: 0 }
    }

    /// The single root element
    pub fn root_element(&self) -> Option<Node<'_>> {
        self.root_element.map(|id| Node { doc: self, id })
    }

    /// Handle for a node id
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        ((id as usize) < self.nodes.len()).then_some(Node { doc: self, id })
    }
}

impl DocumentAccess for XmlDocument {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    fn string(&self, id: u32) -> &str {
        self.strings.get(id)
    }

    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }
}

/// Borrowed handle to one node of an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a XmlDocument,
    id: NodeId,
}

impl<'a> Node<'a> {
    #[inline]
    fn raw(&self) -> &'a XmlNode {
        &self.doc.nodes[self.id as usize]
    }

    /// Arena index; ordering ids is ordering in document order
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a XmlDocument {
        self.doc
    }

    pub fn kind(&self) -> NodeKind {
        self.raw().kind
    }

    /// Local name (elements, attributes) or target (declarations)
    pub fn local_name(&self) -> &'a str {
        self.doc.strings.get(self.raw().name_id)
    }

    /// Prefix as written in the markup
    pub fn prefix(&self) -> &'a str {
        self.doc.strings.get(self.raw().prefix_id)
    }

    pub fn namespace_uri(&self) -> &'a str {
        self.doc.strings.get(self.raw().namespace_id)
    }

    /// `prefix:local` or just `local`
    pub fn qualified_name(&self) -> Cow<'a, str> {
        match self.prefix() {
            "" => Cow::Borrowed(self.local_name()),
            prefix => Cow::Owned(format!("{prefix}:{}", self.local_name())),
        }
    }

    /// Attribute value, character data, declaration content or DOCTYPE body
    pub fn value(&self) -> &'a str {
        self.doc.strings.get(self.raw().value_id)
    }

    /// Node data as exposed in output records
    ///
    /// Text, CDATA and comments give their content, attributes their value,
    /// declarations their target and notations the directive body. Elements
    /// and the document have none.
    pub fn data(&self) -> &'a str {
        match self.kind() {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::Attribute | NodeKind::Notation => {
                self.value()
            }
            NodeKind::Declaration => self.local_name(),
            NodeKind::Element | NodeKind::Document => "",
        }
    }

    pub fn is_namespace_declaration(&self) -> bool {
        self.raw().is_namespace_decl
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.raw().parent.map(|id| Node { doc: self.doc, id })
    }

    /// Children in document order (attributes are not children)
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).map(move |id| Node { doc, id })
    }

    /// Attributes in document order, namespace declarations included
    pub fn attributes(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        let range = match self.kind() {
            NodeKind::Element => self.raw().attribute_ids(),
            _ => 0..0,
        };
        range.map(move |id| Node { doc, id })
    }

    /// Value of the un-namespaced attribute with this local name
    pub fn attribute(&self, local_name: &str) -> Option<&'a str> {
        self.attributes()
            .find(|a| a.namespace_uri().is_empty() && a.local_name() == local_name)
            .map(|a| a.value())
    }

    /// XPath string-value
    pub fn string_value(&self) -> String {
        node_string_value(self.doc, self.id)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("name", &self.qualified_name())
            .finish()
    }
}

struct OpenElement<'s> {
    id: NodeId,
    qname: &'s str,
}

/// Builds the arena from reader events, enforcing the well-formedness rules
/// that need the element stack or namespace scope
struct TreeBuilder<'s> {
    doc: XmlDocument,
    resolver: NamespaceResolver,
    open: Vec<OpenElement<'s>>,
    seen_doctype: bool,
}

impl<'s> TreeBuilder<'s> {
    fn new() -> Self {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        TreeBuilder {
            doc: XmlDocument {
                nodes: vec![XmlNode::document()],
                strings,
                root_element: None,
            },
            resolver,
            open: Vec::new(),
            seen_doctype: false,
        }
    }

    fn build(mut self, mut reader: SliceReader<'s>) -> Result<XmlDocument, ParseError> {
        while let Some(Positioned { offset, event }) = reader.next_event()? {
            let top_level = self.open.is_empty();
            match event {
                XmlEvent::XmlDeclaration { content } => {
                    let target = self.doc.strings.intern("xml");
                    let value = self.doc.strings.intern(content);
                    self.append(XmlNode::declaration(0, target, value));
                }
                XmlEvent::ProcessingInstruction { target, content } => {
                    let target = self.doc.strings.intern(target);
                    let value = self.doc.strings.intern(&content);
                    self.append(XmlNode::declaration(self.parent(), target, value));
                }
                XmlEvent::Comment(content) => {
                    let value = self.doc.strings.intern(&content);
                    self.append(XmlNode::leaf(NodeKind::Comment, self.parent(), value));
                }
                XmlEvent::DocType(body) => {
                    if !top_level || self.seen_doctype || self.doc.root_element.is_some() {
                        return Err(reader.error_at(offset, ParseErrorKind::MisplacedDoctype));
                    }
                    self.seen_doctype = true;
                    let value = self.doc.strings.intern(body);
                    self.append(XmlNode::leaf(NodeKind::Notation, 0, value));
                }
                XmlEvent::Text(text) if top_level => {
                    if !text.bytes().all(is_whitespace) {
                        return Err(reader.error_at(offset, ParseErrorKind::OutsideRoot("text")));
                    }
                }
                XmlEvent::Text(text) => {
                    let value = self.doc.strings.intern(&text);
                    self.append(XmlNode::leaf(NodeKind::Text, self.parent(), value));
                }
                XmlEvent::CData(_) if top_level => {
                    return Err(reader.error_at(offset, ParseErrorKind::OutsideRoot("CDATA section")));
                }
                XmlEvent::CData(content) => {
                    let value = self.doc.strings.intern(&content);
                    self.append(XmlNode::leaf(NodeKind::CData, self.parent(), value));
                }
                XmlEvent::StartElement(start) => self.start_element(&reader, offset, start)?,
                XmlEvent::EndElement { name } => self.end_element(&reader, offset, name)?,
            }
        }

        let eof = reader.position();
        if let Some(open) = self.open.last() {
            return Err(reader.error_at(eof, ParseErrorKind::UnclosedTag(open.qname.to_string())));
        }
        if self.doc.root_element.is_none() {
            return Err(reader.error_at(eof, ParseErrorKind::NoRootElement));
        }
        self.close(0);
        Ok(self.doc)
    }

    fn parent(&self) -> NodeId {
        self.open.last().map_or(0, |e| e.id)
    }

    /// Push a node without linking it into the child list
    fn push(&mut self, mut node: XmlNode) -> NodeId {
        let id = self.doc.nodes.len() as NodeId;
        node.subtree_end = id;
        self.doc.nodes.push(node);
        id
    }

    /// Push a node and link it as the last child of its parent
    fn append(&mut self, node: XmlNode) -> NodeId {
        let parent_id = node.parent.unwrap_or(0);
        let id = self.push(node);
        self.link_child(parent_id, id);
        id
    }

    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child = self.doc.nodes[parent_id as usize].last_child;
        if let Some(last_id) = last_child {
            self.doc.nodes[child_id as usize].prev_sibling = Some(last_id);
            self.doc.nodes[last_id as usize].next_sibling = Some(child_id);
        } else {
            self.doc.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.doc.nodes[parent_id as usize].last_child = Some(child_id);
    }

    /// Record that every node after `id` so far belongs to its subtree
    fn close(&mut self, id: NodeId) {
        let end = (self.doc.nodes.len() - 1) as NodeId;
        self.doc.nodes[id as usize].subtree_end = end;
    }

    fn start_element(
        &mut self,
        reader: &SliceReader<'s>,
        offset: usize,
        start: StartElement<'s>,
    ) -> Result<(), ParseError> {
        if self.open.is_empty() && self.doc.root_element.is_some() {
            return Err(reader.error_at(offset, ParseErrorKind::MultipleRoots));
        }

        self.resolver.push_scope();
        for attr in start.attributes.iter().filter(|a| a.is_namespace_declaration()) {
            let uri_id = self.doc.strings.intern(&attr.value);
            let declared = match attr.name.strip_prefix("xmlns:") {
                Some(prefix) if !is_ncname(prefix) => Err(ParseErrorKind::InvalidName(attr.name.to_string())),
                Some(prefix) => {
                    let prefix_id = self.doc.strings.intern(prefix);
                    self.resolver.declare(prefix_id, uri_id, &self.doc.strings)
                }
                None => self.resolver.declare_default(uri_id),
            };
            declared.map_err(|kind| reader.error_at(attr.offset, kind))?;
        }

        let (prefix, local) = split_qname(start.name)
            .ok_or_else(|| reader.error_at(offset + 1, ParseErrorKind::InvalidName(start.name.to_string())))?;
        let prefix_id = prefix.map_or(EMPTY, |p| self.doc.strings.intern(p));
        let namespace_id = match prefix {
            Some(p) => self
                .resolver
                .resolve(prefix_id)
                .ok_or_else(|| reader.error_at(offset + 1, ParseErrorKind::UndeclaredPrefix(p.to_string())))?,
            None => self.resolver.resolve_default(),
        };
        let name_id = self.doc.strings.intern(local);

        let parent = self.parent();
        let id = self.append(XmlNode::element(parent, name_id, prefix_id, namespace_id));
        if parent == 0 {
            self.doc.root_element = Some(id);
        }

        let mut expanded: Vec<(u32, u32)> = Vec::with_capacity(start.attributes.len());
        for (i, attr) in start.attributes.iter().enumerate() {
            if start.attributes[..i].iter().any(|a| a.name == attr.name) {
                return Err(reader.error_at(attr.offset, ParseErrorKind::DuplicateAttribute(attr.name.to_string())));
            }
            let node = self.attribute_node(reader, id, attr)?;
            if !node.is_namespace_decl {
                let key = (node.namespace_id, node.name_id);
                if expanded.contains(&key) {
                    return Err(
                        reader.error_at(attr.offset, ParseErrorKind::DuplicateAttribute(attr.name.to_string()))
                    );
                }
                expanded.push(key);
            }
            self.push(node);
        }
        let element = &mut self.doc.nodes[id as usize];
        element.attr_start = id + 1;
        element.attr_count = start.attributes.len() as u32;

        if start.is_empty {
            self.close(id);
            self.resolver.pop_scope();
        } else {
            self.open.push(OpenElement { id, qname: start.name });
        }
        Ok(())
    }

    fn attribute_node(
        &mut self,
        reader: &SliceReader<'s>,
        element: NodeId,
        attr: &Attribute<'s>,
    ) -> Result<XmlNode, ParseError> {
        let value_id = self.doc.strings.intern(&attr.value);
        let mut node = XmlNode::new(NodeKind::Attribute, Some(element));
        node.value_id = value_id;

        if attr.is_namespace_declaration() {
            let (prefix, local) = attr.name.split_once(':').unwrap_or(("", attr.name));
            node.prefix_id = self.doc.strings.intern(prefix);
            node.name_id = self.doc.strings.intern(local);
            node.namespace_id = self.resolver.xmlns_uri_id();
            node.is_namespace_decl = true;
            return Ok(node);
        }

        let (prefix, local) = split_qname(attr.name)
            .ok_or_else(|| reader.error_at(attr.offset, ParseErrorKind::InvalidName(attr.name.to_string())))?;
        node.name_id = self.doc.strings.intern(local);
        if let Some(p) = prefix {
            node.prefix_id = self.doc.strings.intern(p);
            node.namespace_id = self
                .resolver
                .resolve(node.prefix_id)
                .ok_or_else(|| reader.error_at(attr.offset, ParseErrorKind::UndeclaredPrefix(p.to_string())))?;
        }
        Ok(node)
    }

    fn end_element(&mut self, reader: &SliceReader<'s>, offset: usize, name: &'s str) -> Result<(), ParseError> {
        match self.open.pop() {
            None => Err(reader.error_at(offset, ParseErrorKind::UnexpectedEndTag(name.to_string()))),
            Some(open) if open.qname != name => Err(reader.error_at(
                offset,
                ParseErrorKind::TagMismatch {
                    expected: open.qname.to_string(),
                    found: name.to_string(),
                },
            )),
            Some(open) => {
                self.close(open.id);
                self.resolver.pop_scope();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> XmlDocument {
        XmlDocument::parse(input.as_bytes()).unwrap()
    }

    fn parse_err(input: &str) -> ParseErrorKind {
        XmlDocument::parse(input.as_bytes()).unwrap_err().kind
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("<root>hello</root>");
        let root = doc.root_element().unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.string_value(), "hello");
        assert_eq!(root.parent(), Some(doc.document()));
    }

    #[test]
    fn test_parse_nested() {
        let doc = parse("<a><b><c/></b></a>");
        let root = doc.root_element().unwrap();
        let children: Vec<_> = root.children().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].local_name(), "b");
    }

    #[test]
    fn test_document_order_ids() {
        let doc = parse("<r x='1'><a y='2'>t</a><b/></r>");
        let kinds: Vec<_> = (0..doc.node_count() as NodeId)
            .map(|id| doc.node(id).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            [
                NodeKind::Document,
                NodeKind::Element,
                NodeKind::Attribute,
                NodeKind::Element,
                NodeKind::Attribute,
                NodeKind::Text,
                NodeKind::Element,
            ]
        );
        let root = doc.get_node(1).unwrap();
        assert_eq!(root.subtree_end, 6);
        assert_eq!(doc.get_node(3).unwrap().subtree_end, 5);
        assert_eq!(doc.get_node(0).unwrap().subtree_end, 6);
    }

    #[test]
    fn test_siblings() {
        let doc = parse("<root><a/><b/><c/></root>");
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 3);
        let first = doc.get_node(children[0]).unwrap();
        assert!(first.prev_sibling.is_none());
        assert_eq!(first.next_sibling, Some(children[1]));
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = parse(r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:a p:x="1" y="2"/><b xmlns=""/></r>"#);
        let root = doc.root_element().unwrap();
        assert_eq!(root.namespace_uri(), "urn:d");

        let a = root.children().next().unwrap();
        assert_eq!((a.prefix(), a.local_name(), a.namespace_uri()), ("p", "a", "urn:p"));
        let attrs: Vec<_> = a.attributes().map(|n| (n.local_name(), n.namespace_uri())).collect();
        assert_eq!(attrs, [("x", "urn:p"), ("y", "")]);

        let b = root.children().nth(1).unwrap();
        assert_eq!(b.namespace_uri(), "");
    }

    #[test]
    fn test_namespace_declarations_kept_as_attributes() {
        let doc = parse(r#"<r xmlns="urn:d" xmlns:p="urn:p" a="1"/>"#);
        let attrs: Vec<_> = doc
            .root_element()
            .unwrap()
            .attributes()
            .map(|n| (n.prefix(), n.local_name(), n.value(), n.is_namespace_declaration()))
            .collect();
        assert_eq!(
            attrs,
            [
                ("", "xmlns", "urn:d", true),
                ("xmlns", "p", "urn:p", true),
                ("", "a", "1", false),
            ]
        );
    }

    #[test]
    fn test_xml_prefix_is_bound() {
        let doc = parse(r#"<r xml:lang="en"/>"#);
        let lang = doc.root_element().unwrap().attributes().next().unwrap();
        assert_eq!(lang.namespace_uri(), "http://www.w3.org/XML/1998/namespace");
    }

    #[test]
    fn test_prolog_nodes() {
        let doc = parse("<?xml version=\"1.0\"?>\n<!DOCTYPE r>\n<?pi data?><!--c--><r/>\n<!--after-->");
        let kinds: Vec<_> = doc.document().children().map(|n| (n.kind(), n.data().to_string())).collect();
        assert_eq!(
            kinds,
            [
                (NodeKind::Declaration, "xml".to_string()),
                (NodeKind::Notation, "DOCTYPE r".to_string()),
                (NodeKind::Declaration, "pi".to_string()),
                (NodeKind::Comment, "c".to_string()),
                (NodeKind::Element, String::new()),
                (NodeKind::Comment, "after".to_string()),
            ]
        );
    }

    #[test]
    fn test_utf16_input() {
        let input: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("<r>ü</r>".encode_utf16().flat_map(u16::to_le_bytes))
            .collect();
        let doc = XmlDocument::parse(&input).unwrap();
        assert_eq!(doc.root_element().unwrap().string_value(), "ü");
    }

    #[test]
    fn test_structure_errors() {
        assert_eq!(parse_err(""), ParseErrorKind::NoRootElement);
        assert_eq!(parse_err("<a/><b/>"), ParseErrorKind::MultipleRoots);
        assert_eq!(parse_err("<a>"), ParseErrorKind::UnclosedTag("a".into()));
        assert_eq!(parse_err("</a>"), ParseErrorKind::UnexpectedEndTag("a".into()));
        assert_eq!(parse_err("text<a/>"), ParseErrorKind::OutsideRoot("text"));
        assert_eq!(parse_err("<a/><!DOCTYPE a>"), ParseErrorKind::MisplacedDoctype);
        assert_eq!(
            parse_err("<a></b>"),
            ParseErrorKind::TagMismatch {
                expected: "a".into(),
                found: "b".into()
            }
        );
    }

    #[test]
    fn test_attribute_errors() {
        assert_eq!(parse_err("<a x='1' x='2'/>"), ParseErrorKind::DuplicateAttribute("x".into()));
        assert_eq!(
            parse_err("<a xmlns:p='u' xmlns:q='u' p:x='1' q:x='2'/>"),
            ParseErrorKind::DuplicateAttribute("q:x".into())
        );
    }

    #[test]
    fn test_namespace_errors() {
        assert_eq!(parse_err("<p:a/>"), ParseErrorKind::UndeclaredPrefix("p".into()));
        assert_eq!(parse_err("<a p:x='1'/>"), ParseErrorKind::UndeclaredPrefix("p".into()));
        assert!(matches!(parse_err("<a xmlns:p=''/>"), ParseErrorKind::InvalidNamespaceDeclaration(_)));
        assert!(matches!(parse_err("<a:b:c/>"), ParseErrorKind::InvalidName(_)));
    }

    #[test]
    fn test_error_position() {
        let err = XmlDocument::parse(b"<a>\n  <b></c>\n</a>").unwrap_err();
        assert_eq!(err.position.line, 2);
        assert_eq!(err.position.column, 6);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = XmlDocument::parse(b"<a>\xFF</a>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidUtf8);
        assert_eq!(err.position.offset, 3);
    }
}
