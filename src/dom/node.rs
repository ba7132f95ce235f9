//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Node ids
//! follow document order: an element's attributes are allocated right after
//! it, then its descendants. `subtree_end` is the id of the last node in that
//! range, which turns the descendant, following and preceding axes into id
//! range scans.

use serde::{Deserialize, Serialize};

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Document root
    Document,
    /// XML declaration or processing instruction
    Declaration,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    #[serde(rename = "cdata")]
    CData,
    /// Comment
    Comment,
    /// Attribute
    Attribute,
    /// DOCTYPE
    Notation,
}

impl NodeKind {
    /// Lowercase name used in output records
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Declaration => "declaration",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::Attribute => "attribute",
            NodeKind::Notation => "notation",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document); an attribute's parent is its element
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Local name (elements, attributes) or target (declarations)
    pub name_id: u32,
    /// Namespace prefix as written, or 0
    pub prefix_id: u32,
    /// Namespace URI, or 0
    pub namespace_id: u32,
    /// Character data, attribute value, declaration content or DOCTYPE body
    pub value_id: u32,
    /// First attribute id (elements)
    pub attr_start: NodeId,
    /// Number of attributes, namespace declarations included
    pub attr_count: u32,
    /// Last id in this node's subtree (itself for leaves)
    pub subtree_end: NodeId,
    /// `xmlns` / `xmlns:*` attribute
    pub is_namespace_decl: bool,
}

impl XmlNode {
    /// Create a node with no links or names
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            subtree_end: 0,
            is_namespace_decl: false,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::new(NodeKind::Document, None)
    }

    /// Create an element with resolved name parts
    pub fn element(parent: NodeId, name_id: u32, prefix_id: u32, namespace_id: u32) -> Self {
        XmlNode {
            name_id,
            prefix_id,
            namespace_id,
            ..Self::new(NodeKind::Element, Some(parent))
        }
    }

    /// Create a character-data style node (text, CDATA, comment, DOCTYPE)
    pub fn leaf(kind: NodeKind, parent: NodeId, value_id: u32) -> Self {
        XmlNode {
            value_id,
            ..Self::new(kind, Some(parent))
        }
    }

    /// Create a declaration / processing instruction node
    pub fn declaration(parent: NodeId, target_id: u32, value_id: u32) -> Self {
        XmlNode {
            name_id: target_id,
            value_id,
            ..Self::new(NodeKind::Declaration, Some(parent))
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    #[inline]
    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }

    /// Ids of this element's attributes, namespace declarations included
    #[inline]
    pub fn attribute_ids(&self) -> std::ops::Range<NodeId> {
        self.attr_start..self.attr_start + self.attr_count
    }
}
