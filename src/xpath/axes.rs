//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes over the arena. Node ids are in document order and
//! every node knows the last id of its subtree, so descendant, following and
//! preceding are range scans. Attribute nodes live in the arena right after
//! their element but are never children, so tree axes skip them.
//!
//! `navigate` returns nodes in axis order: forward axes in document order,
//! reverse axes (parent, ancestor, preceding...) nearest first.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(context).collect(),
        Axis::Descendant => descendant_axis(doc, context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(descendant_axis(doc, context));
            result
        }
        Axis::Parent => parent_of(doc, context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(doc, context, |n| n.next_sibling),
        Axis::PrecedingSibling => sibling_axis(doc, context, |n| n.prev_sibling),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => attribute_axis(doc, context),
        // Namespace nodes are not materialized
        Axis::Namespace => Vec::new(),
    }
}

fn parent_of<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Option<NodeId> {
    doc.get_node(id).and_then(|n| n.parent)
}

fn subtree_end<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> NodeId {
    doc.get_node(id).map_or(id, |n| n.subtree_end)
}

fn is_tree_node<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> bool {
    doc.get_node(id).is_some_and(|n| !n.is_attribute())
}

/// descendant:: axis - every node strictly inside the subtree
fn descendant_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    (context + 1..=subtree_end(doc, context))
        .filter(|&id| is_tree_node(doc, id))
        .collect()
}

/// ancestor:: axis - parent, grandparent, ... up to the document node
fn ancestor_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = parent_of(doc, current) {
        result.push(parent);
        current = parent;
    }
    result
}

/// following-sibling:: and preceding-sibling::, attributes have no siblings
fn sibling_axis<D, F>(doc: &D, context: NodeId, step: F) -> Vec<NodeId>
where
    D: DocumentAccess + ?Sized,
    F: Fn(&crate::dom::XmlNode) -> Option<NodeId>,
{
    let mut result = Vec::new();
    if !is_tree_node(doc, context) {
        return result;
    }
    let mut sibling = doc.get_node(context).and_then(&step);
    while let Some(id) = sibling {
        result.push(id);
        sibling = doc.get_node(id).and_then(&step);
    }
    result
}

/// following:: axis - everything after the subtree, in document order
fn following_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let count = doc.node_count() as NodeId;
    (subtree_end(doc, context) + 1..count)
        .filter(|&id| is_tree_node(doc, id))
        .collect()
}

/// preceding:: axis - everything before the context that is not an ancestor
fn preceding_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    (0..context)
        .rev()
        .filter(|&id| is_tree_node(doc, id) && subtree_end(doc, id) < context)
        .collect()
}

/// attribute:: axis - attributes of an element, namespace declarations excluded
fn attribute_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    match doc.get_node(context) {
        Some(node) if node.is_element() => node
            .attribute_ids()
            .filter(|&id| doc.get_node(id).is_some_and(|a| !a.is_namespace_decl))
            .collect(),
        _ => Vec::new(),
    }
}

/// Check if a node matches a node test
///
/// Name tests and `*` only match the axis' principal node kind: attributes
/// on the attribute axis, elements everywhere else.
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    axis: Axis,
    node_test: &CompiledNodeTest,
) -> bool {
    let Some(kind) = doc.kind(node_id) else {
        return false;
    };
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };

    match node_test {
        CompiledNodeTest::Any => kind == principal,
        CompiledNodeTest::Name { namespace_uri, local } => {
            kind == principal && doc.local_name(node_id) == local && doc.namespace_uri(node_id) == namespace_uri
        }
        CompiledNodeTest::Namespace(uri) => kind == principal && doc.namespace_uri(node_id) == uri,
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            // The XML declaration is stored as a declaration but is not a PI
            kind == NodeKind::Declaration
                && doc.local_name(node_id) != "xml"
                && target.as_deref().is_none_or(|t| doc.local_name(node_id) == t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn names(doc: &XmlDocument, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| match doc.kind(id) {
                Some(NodeKind::Element) | Some(NodeKind::Attribute) => doc.local_name(id).to_string(),
                Some(kind) => kind.to_string(),
                None => "?".to_string(),
            })
            .collect()
    }

    fn find(doc: &XmlDocument, name: &str) -> NodeId {
        (0..doc.node_count() as NodeId)
            .find(|&id| doc.kind(id) == Some(NodeKind::Element) && doc.local_name(id) == name)
            .unwrap()
    }

    const DOC: &[u8] = b"<root><a x='1'><b/><c/></a><d><e/></d></root>";

    #[test]
    fn test_child_axis() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(names(&doc, &navigate(&doc, root, Axis::Child)), ["a", "d"]);
    }

    #[test]
    fn test_descendant_axis_skips_attributes() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(names(&doc, &navigate(&doc, root, Axis::Descendant)), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_ancestor_axis_is_nearest_first() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let b = find(&doc, "b");
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Ancestor)), ["a", "root", "document"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let c = find(&doc, "c");
        assert_eq!(names(&doc, &navigate(&doc, c, Axis::Following)), ["d", "e"]);
        assert_eq!(names(&doc, &navigate(&doc, c, Axis::Preceding)), ["b"]);
        let e = find(&doc, "e");
        assert_eq!(names(&doc, &navigate(&doc, e, Axis::Preceding)), ["c", "b", "a"]);
    }

    #[test]
    fn test_sibling_axes() {
        let doc = XmlDocument::parse(b"<r><a/><b/><c/></r>").unwrap();
        let b = find(&doc, "b");
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::FollowingSibling)), ["c"]);
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::PrecedingSibling)), ["a"]);
    }

    #[test]
    fn test_attribute_axis_excludes_namespace_declarations() {
        let doc = XmlDocument::parse(b"<r xmlns:p='urn:p' p:k='1' plain='2'/>").unwrap();
        let root = doc.root_element_id().unwrap();
        let attrs = navigate(&doc, root, Axis::Attribute);
        assert_eq!(names(&doc, &attrs), ["k", "plain"]);
        let attr = attrs[0];
        assert!(navigate(&doc, attr, Axis::FollowingSibling).is_empty());
        assert_eq!(navigate(&doc, attr, Axis::Parent), [root]);
    }

    #[test]
    fn test_following_from_attribute_includes_children() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let a = find(&doc, "a");
        let x = navigate(&doc, a, Axis::Attribute)[0];
        assert_eq!(names(&doc, &navigate(&doc, x, Axis::Following)), ["b", "c", "d", "e"]);
    }

    #[test]
    fn test_node_tests() {
        let doc = XmlDocument::parse(b"<?xml version='1.0'?><?style x?><r a='1'>t<![CDATA[c]]><!--n--></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let top = navigate(&doc, 0, Axis::Child);
        let pis: Vec<_> = top
            .iter()
            .filter(|&&id| matches_node_test(&doc, id, Axis::Child, &CompiledNodeTest::ProcessingInstruction(None)))
            .collect();
        assert_eq!(pis.len(), 1);

        let children = navigate(&doc, root, Axis::Child);
        let texts = children
            .iter()
            .filter(|&&id| matches_node_test(&doc, id, Axis::Child, &CompiledNodeTest::Text))
            .count();
        assert_eq!(texts, 2);

        let attr = navigate(&doc, root, Axis::Attribute)[0];
        assert!(matches_node_test(&doc, attr, Axis::Attribute, &CompiledNodeTest::Any));
        assert!(!matches_node_test(&doc, attr, Axis::Child, &CompiledNodeTest::Any));
        assert!(!matches_node_test(&doc, root, Axis::Attribute, &CompiledNodeTest::Any));
    }
}
