//! Namespace bindings supplied with an expression
//!
//! Maps prefixes used in the expression to namespace URIs. The empty prefix
//! is the default namespace for unprefixed element name tests. URIs must be
//! non-empty; the map is validated when built or deserialized.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dom::namespace::ns;
use crate::error::BindingError;

/// Prefix → namespace URI table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct NamespaceBindings(HashMap<String, String>);

impl NamespaceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, replacing any previous URI for the prefix
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Result<(), BindingError> {
        let prefix = prefix.into();
        let uri = uri.into();
        if uri.is_empty() {
            return Err(BindingError::EmptyUri(prefix));
        }
        self.0.insert(prefix, uri);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Result<Self, BindingError> {
        self.insert(prefix, uri)?;
        Ok(self)
    }

    /// URI bound to a prefix; `xml` is always bound
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match self.0.get(prefix) {
            Some(uri) => Some(uri),
            None if prefix == "xml" => Some(ns::XML),
            None => None,
        }
    }

    /// URI for unprefixed element name tests, if one was bound
    pub fn default_uri(&self) -> Option<&str> {
        self.0.get("").map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Bindings sorted by prefix, a stable key for caching
    pub fn sorted(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self.0.iter().map(|(p, u)| (p.clone(), u.clone())).collect();
        pairs.sort();
        pairs
    }
}

impl TryFrom<HashMap<String, String>> for NamespaceBindings {
    type Error = BindingError;

    fn try_from(map: HashMap<String, String>) -> Result<Self, Self::Error> {
        if let Some((prefix, _)) = map.iter().find(|(_, uri)| uri.is_empty()) {
            return Err(BindingError::EmptyUri(prefix.clone()));
        }
        Ok(NamespaceBindings(map))
    }
}

impl From<NamespaceBindings> for HashMap<String, String> {
    fn from(bindings: NamespaceBindings) -> Self {
        bindings.0
    }
}

impl<'a> TryFrom<&[(&'a str, &'a str)]> for NamespaceBindings {
    type Error = BindingError;

    fn try_from(pairs: &[(&'a str, &'a str)]) -> Result<Self, Self::Error> {
        pairs
            .iter()
            .try_fold(NamespaceBindings::new(), |bindings, (prefix, uri)| bindings.with(*prefix, *uri))
    }
}
