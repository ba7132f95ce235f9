//! Namespace Resolution
//!
//! Stack-based namespace resolver used while building the tree. Bindings are
//! string-pool ids; prefix id 0 stands for the default namespace and URI id 0
//! for "no namespace".

use super::strings::{StringPool, EMPTY};
use crate::error::ParseErrorKind;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u32,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u32,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
    xml_uri_id: u32,
    xmlns_uri_id: u32,
}

impl NamespaceResolver {
    /// Create a new resolver with the `xml` prefix pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![NsBinding {
                prefix_id: xml_prefix_id,
                uri_id: xml_uri_id,
                depth: 0,
            }],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
            xml_uri_id,
            xmlns_uri_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare `xmlns:prefix="uri"` for the current scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32, strings: &StringPool) -> Result<(), ParseErrorKind> {
        let prefix = strings.get(prefix_id);
        if prefix_id == self.xmlns_prefix_id {
            return Err(invalid("the 'xmlns' prefix cannot be declared"));
        }
        if prefix_id == self.xml_prefix_id {
            return if uri_id == self.xml_uri_id {
                Ok(())
            } else {
                Err(invalid("the 'xml' prefix cannot be rebound"))
            };
        }
        if uri_id == EMPTY {
            return Err(invalid(format!("prefix '{prefix}' cannot be bound to an empty URI")));
        }
        if uri_id == self.xml_uri_id || uri_id == self.xmlns_uri_id {
            return Err(invalid(format!("prefix '{prefix}' cannot be bound to a reserved namespace")));
        }
        self.push(prefix_id, uri_id);
        Ok(())
    }

    /// Declare `xmlns="uri"` for the current scope; an empty URI undeclares it
    pub fn declare_default(&mut self, uri_id: u32) -> Result<(), ParseErrorKind> {
        if uri_id == self.xml_uri_id || uri_id == self.xmlns_uri_id {
            return Err(invalid("the default namespace cannot be a reserved namespace"));
        }
        self.push(EMPTY, uri_id);
        Ok(())
    }

    fn push(&mut self, prefix_id: u32, uri_id: u32) {
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to a namespace URI id
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Namespace of unprefixed element names in the current scope
    pub fn resolve_default(&self) -> u32 {
        self.resolve(EMPTY).unwrap_or(EMPTY)
    }

    /// URI id the `xmlns` attributes themselves belong to
    pub fn xmlns_uri_id(&self) -> u32 {
        self.xmlns_uri_id
    }
}

fn invalid(message: impl Into<String>) -> ParseErrorKind {
    ParseErrorKind::InvalidNamespaceDeclaration(message.into())
}
