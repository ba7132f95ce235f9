//! Result normalization
//!
//! Copies a matched node out of the tree into an owned, serializable record
//! with a uniform shape for every node kind.

use serde::{Deserialize, Serialize};

use crate::dom::{Node, NodeKind};

/// One matched node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Local name for elements, empty otherwise
    pub name: String,
    pub prefix: String,
    pub namespace_uri: String,
    /// The element's attributes in document order, namespace declarations included
    pub attributes: Vec<AttributeRecord>,
    /// Character data, attribute value, declaration target or DOCTYPE body
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub name: String,
    pub prefix: String,
    pub namespace_uri: String,
    pub value: String,
}

impl From<Node<'_>> for AttributeRecord {
    fn from(attr: Node<'_>) -> Self {
        AttributeRecord {
            name: attr.local_name().to_string(),
            prefix: attr.prefix().to_string(),
            namespace_uri: attr.namespace_uri().to_string(),
            value: attr.value().to_string(),
        }
    }
}

/// Build the output record for a node
pub fn normalize(node: Node<'_>) -> OutputRecord {
    let kind = node.kind();
    let (name, attributes) = match kind {
        NodeKind::Element => (
            node.local_name().to_string(),
            node.attributes().map(AttributeRecord::from).collect(),
        ),
        _ => (String::new(), Vec::new()),
    };
    OutputRecord {
        kind,
        name,
        prefix: node.prefix().to_string(),
        namespace_uri: node.namespace_uri().to_string(),
        attributes,
        data: node.data().to_string(),
    }
}

impl From<Node<'_>> for OutputRecord {
    fn from(node: Node<'_>) -> Self {
        normalize(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    #[test]
    fn element_record_has_name_and_attributes() {
        let doc = XmlDocument::parse(b"<p:e xmlns:p='urn:p' a='1' p:b='2'>text</p:e>").unwrap();
        let record = normalize(doc.root_element().unwrap());
        assert_eq!(record.kind, NodeKind::Element);
        assert_eq!(record.name, "e");
        assert_eq!(record.prefix, "p");
        assert_eq!(record.namespace_uri, "urn:p");
        assert_eq!(record.data, "");
        let names: Vec<_> = record.attributes.iter().map(|a| (a.prefix.as_str(), a.name.as_str())).collect();
        assert_eq!(names, [("xmlns", "p"), ("", "a"), ("p", "b")]);
        assert_eq!(record.attributes[2].namespace_uri, "urn:p");
        assert_eq!(record.attributes[2].value, "2");
    }

    #[test]
    fn leaf_records_carry_data_only() {
        let doc = XmlDocument::parse(b"<?xml version='1.0'?><r a='v'>t &amp; <![CDATA[<raw>]]><!--c--></r>").unwrap();
        let root = doc.root_element().unwrap();
        let records: Vec<_> = root.children().map(normalize).collect();
        let summary: Vec<_> = records.iter().map(|r| (r.kind, r.data.as_str())).collect();
        assert_eq!(
            summary,
            [
                (NodeKind::Text, "t & "),
                (NodeKind::CData, "<raw>"),
                (NodeKind::Comment, "c")
            ]
        );
        assert!(records.iter().all(|r| r.name.is_empty() && r.attributes.is_empty()));

        let attr = normalize(root.attributes().next().unwrap());
        assert_eq!((attr.kind, attr.name.as_str(), attr.data.as_str()), (NodeKind::Attribute, "", "v"));

        let decl = normalize(doc.document().children().next().unwrap());
        assert_eq!((decl.kind, decl.data.as_str()), (NodeKind::Declaration, "xml"));
    }

    #[test]
    fn serializes_with_record_field_names() {
        let doc = XmlDocument::parse(b"<r>x</r>").unwrap();
        let text = doc.root_element().unwrap().children().next().unwrap();
        let json = serde_json::to_value(normalize(text)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "text",
                "name": "",
                "prefix": "",
                "namespace_uri": "",
                "attributes": [],
                "data": "x"
            })
        );
    }
}
