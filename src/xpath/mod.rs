//! XPath 1.0 Engine
//!
//! Namespace-aware XPath 1.0:
//! - All 13 axes (the namespace axis is always empty)
//! - The core function library plus a few string helpers
//! - Prefixes resolved against caller bindings at compile time
//! - Compiled expression caching

pub mod axes;
pub mod bindings;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use bindings::NamespaceBindings;
pub use cache::ExpressionCache;
pub use compiler::CompiledExpression;
pub use value::XPathValue;

use crate::dom::Node;
use crate::error::{CompileError, EvalError};

/// Compile `text` against `bindings`
pub fn compile(text: &str, bindings: &NamespaceBindings) -> Result<CompiledExpression, CompileError> {
    CompiledExpression::compile(text, bindings)
}

/// Evaluate `expr` with `context` as the context node
pub fn evaluate(context: Node<'_>, expr: &CompiledExpression) -> Result<XPathValue, EvalError> {
    eval::evaluate(context.document(), context.id(), expr)
}

/// Select the nodes matched by `expr`, in document order
///
/// The expression must produce a node-set; zero matches is an empty `Vec`.
pub fn select<'a>(context: Node<'a>, expr: &CompiledExpression) -> Result<Vec<Node<'a>>, EvalError> {
    let doc = context.document();
    match eval::evaluate(doc, context.id(), expr)? {
        XPathValue::NodeSet(ids) => {
            tracing::debug!(expression = expr.source(), matches = ids.len(), "selected nodes");
            Ok(ids.into_iter().filter_map(|id| doc.node(id)).collect())
        }
        other => Err(EvalError::new(format!(
            "expression '{}' evaluates to a {}, not a node-set",
            expr.source(),
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeKind, XmlDocument};

    #[test]
    fn select_from_document_node() {
        let doc = XmlDocument::parse(b"<r><a>1</a><a>2</a></r>").unwrap();
        let expr = compile("//a", &NamespaceBindings::new()).unwrap();
        let nodes = select(doc.document(), &expr).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.kind() == NodeKind::Element));
        assert_eq!(nodes[1].string_value(), "2");
    }

    #[test]
    fn select_relative_to_element() {
        let doc = XmlDocument::parse(b"<r><a><b/></a><b/></r>").unwrap();
        let a = doc.root_element().unwrap().children().next().unwrap();
        let expr = compile("b", &NamespaceBindings::new()).unwrap();
        assert_eq!(select(a, &expr).unwrap().len(), 1);
    }

    #[test]
    fn select_rejects_scalar_results() {
        let doc = XmlDocument::parse(b"<r/>").unwrap();
        let expr = compile("count(//r)", &NamespaceBindings::new()).unwrap();
        let err = select(doc.document(), &expr).unwrap_err();
        assert!(err.message.contains("number"));
        assert_eq!(evaluate(doc.document(), &expr).unwrap(), XPathValue::Number(1.0));
    }
}
