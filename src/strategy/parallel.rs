//! Parallel XPath Evaluation
//!
//! Uses Rayon to evaluate several compiled expressions against one parsed
//! document. The document is read-only, so every worker borrows it.

use rayon::prelude::*;

use crate::dom::{Node, XmlDocument};
use crate::error::EvalError;
use crate::xpath::{self, CompiledExpression, XPathValue};

/// Select with multiple expressions in parallel; results follow input order
pub fn select_parallel<'a>(
    doc: &'a XmlDocument,
    exprs: &[&CompiledExpression],
) -> Vec<Result<Vec<Node<'a>>, EvalError>> {
    tracing::debug!(expressions = exprs.len(), "parallel select");
    exprs
        .par_iter()
        .map(|expr| xpath::select(doc.document(), expr))
        .collect()
}

/// Evaluate multiple expressions in parallel, keeping scalar results
pub fn evaluate_parallel(doc: &XmlDocument, exprs: &[&CompiledExpression]) -> Vec<Result<XPathValue, EvalError>> {
    exprs
        .par_iter()
        .map(|expr| xpath::evaluate(doc.document(), expr))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::NamespaceBindings;

    fn compile_all(sources: &[&str]) -> Vec<CompiledExpression> {
        let bindings = NamespaceBindings::new().with("p", "urn:p").unwrap();
        sources
            .iter()
            .map(|s| CompiledExpression::compile(s, &bindings).unwrap())
            .collect()
    }

    #[test]
    fn test_parallel_select_keeps_input_order() {
        let doc = XmlDocument::parse(b"<root xmlns:q='urn:p'><a/><b/><b/><q:c/></root>").unwrap();
        let exprs = compile_all(&["//a", "//b", "//p:c", "//missing"]);
        let refs: Vec<_> = exprs.iter().collect();

        let counts: Vec<usize> = select_parallel(&doc, &refs)
            .into_iter()
            .map(|r| r.unwrap().len())
            .collect();
        assert_eq!(counts, [1, 2, 1, 0]);
    }

    #[test]
    fn test_parallel_errors_stay_per_expression() {
        let doc = XmlDocument::parse(b"<root><a/></root>").unwrap();
        let exprs = compile_all(&["count(//a)", "//a"]);
        let refs: Vec<_> = exprs.iter().collect();

        let selected = select_parallel(&doc, &refs);
        assert!(selected[0].is_err());
        assert!(selected[1].is_ok());

        let values = evaluate_parallel(&doc, &refs);
        assert_eq!(values[0], Ok(XPathValue::Number(1.0)));
    }
}
