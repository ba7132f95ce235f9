//! DOM Module - Arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes, attributes included, in document order
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names, URIs and character data
//! - Namespace resolution stack applied while building

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;

pub use document::{Node, XmlDocument};
pub use node::{NodeId, NodeKind, XmlNode};
pub use strings::StringPool;

/// Read access to an arena document, the interface XPath evaluates against
pub trait DocumentAccess {
    /// Number of nodes in the arena (document node included)
    fn node_count(&self) -> usize;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Resolve an interned string id
    fn string(&self, id: u32) -> &str;

    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Local name of an element or attribute, target of a declaration
    fn local_name(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.string(n.name_id))
    }

    fn prefix(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.string(n.prefix_id))
    }

    fn namespace_uri(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.string(n.namespace_id))
    }

    /// Character data, attribute value, declaration content or DOCTYPE body
    fn value(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.string(n.value_id))
    }

    /// Child ids in document order
    fn children(&self, id: NodeId) -> Children<'_, Self> {
        Children {
            doc: self,
            next: self.get_node(id).and_then(|n| n.first_child),
        }
    }
}

/// Iterator over the children of a node
pub struct Children<'d, D: DocumentAccess + ?Sized> {
    doc: &'d D,
    next: Option<NodeId>,
}

impl<D: DocumentAccess + ?Sized> Iterator for Children<'_, D> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.get_node(id).and_then(|n| n.next_sibling);
        Some(id)
    }
}

/// XPath string-value of a node
///
/// Document and element nodes concatenate the text and CDATA descendants in
/// document order; every other kind returns its own value.
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    let Some(node) = doc.get_node(id) else {
        return String::new();
    };
    match node.kind {
        NodeKind::Document | NodeKind::Element => (id + 1..=node.subtree_end)
            .filter_map(|d| doc.get_node(d).map(|n| (d, n)))
            .filter(|(_, n)| matches!(n.kind, NodeKind::Text | NodeKind::CData))
            .map(|(d, _)| doc.value(d))
            .collect(),
        _ => doc.value(id).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value_concatenates_descendant_text() {
        let doc = XmlDocument::parse(b"<r a='x'>one<b>two<![CDATA[<3>]]></b><!--no-->four</r>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(node_string_value(&doc, root), "onetwo<3>four");
        assert_eq!(node_string_value(&doc, 0), "onetwo<3>four");
    }

    #[test]
    fn test_string_value_of_attribute() {
        let doc = XmlDocument::parse(b"<r a='x &amp; y'/>").unwrap();
        let root = doc.root_element_id().unwrap();
        let attr = doc.get_node(root).unwrap().attr_start;
        assert_eq!(node_string_value(&doc, attr), "x & y");
    }

    #[test]
    fn test_children_skip_attributes() {
        let doc = XmlDocument::parse(b"<r a='1' b='2'><x/><y/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc.children(root).map(|id| doc.local_name(id)).collect();
        assert_eq!(names, ["x", "y"]);
    }
}
