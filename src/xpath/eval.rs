//! XPath Evaluation Engine
//!
//! Runs compiled programs on a value stack against any [`DocumentAccess`].
//! Node-sets on the stack are always sorted in document order without
//! duplicates; proximity positions inside step predicates follow axis order.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledExpression, CompiledStep, Op};
use super::functions;
use super::parser::BinaryOp;
use super::value::XPathValue;
use crate::dom::{node_string_value, DocumentAccess, NodeId};
use crate::error::EvalError;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    fn with_node(&self, context_node: NodeId, context_position: usize, context_size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            context_node,
            context_position,
            context_size,
        }
    }
}

/// Evaluate a compiled expression with `context` as the context node
pub fn evaluate<D: DocumentAccess + ?Sized>(
    doc: &D,
    context: NodeId,
    expr: &CompiledExpression,
) -> Result<XPathValue, EvalError> {
    let ctx = EvalContext {
        doc,
        context_node: context,
        context_position: 1,
        context_size: 1,
    };
    evaluate_compiled(expr.program(), &ctx)
}

/// Evaluate a compiled program
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, EvalError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            // Root is the document node, not the root element
            Op::Root => stack.push(XPathValue::single_node(0)),

            Op::Context => stack.push(XPathValue::single_node(ctx.context_node)),

            Op::Step(step) => {
                let nodes = node_set(pop(&mut stack)?, "a location step")?;
                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    result.extend(apply_step(ctx, node, step)?);
                }
                // Node ids are assigned in document order
                result.sort_unstable();
                result.dedup();
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Predicate(pred) => {
                let nodes = node_set(pop(&mut stack)?, "a predicate")?;
                stack.push(XPathValue::NodeSet(filter(ctx, nodes, pred)?));
            }

            Op::Union => {
                let right = node_set(pop(&mut stack)?, "'|'")?;
                let mut result = node_set(pop(&mut stack)?, "'|'")?;
                result.extend(right);
                result.sort_unstable();
                result.dedup();
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Negate => {
                let value = pop(&mut stack)?;
                stack.push(XPathValue::Number(-value.to_number(ctx.doc)));
            }

            Op::And(right) => {
                let left = pop(&mut stack)?.to_boolean();
                let result = left && evaluate_compiled(right, ctx)?.to_boolean();
                stack.push(XPathValue::Boolean(result));
            }

            Op::Or(right) => {
                let left = pop(&mut stack)?.to_boolean();
                let result = left || evaluate_compiled(right, ctx)?.to_boolean();
                stack.push(XPathValue::Boolean(result));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(binary(ctx.doc, *op, &left, &right));
            }

            Op::Call(function, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(stack_underflow());
                }
                let args = stack.split_off(stack.len() - arg_count);
                let result = functions::call(
                    *function,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;
                stack.push(result);
            }
        }
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, EvalError> {
    stack.pop().ok_or_else(stack_underflow)
}

fn stack_underflow() -> EvalError {
    EvalError::new("malformed expression: evaluation stack is empty")
}

fn node_set(value: XPathValue, operation: &str) -> Result<Vec<NodeId>, EvalError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(EvalError::new(format!(
            "{operation} requires a node-set, got {}",
            other.type_name()
        ))),
    }
}

/// One location step from one context node, predicates applied in axis order
fn apply_step<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    node: NodeId,
    step: &CompiledStep,
) -> Result<Vec<NodeId>, EvalError> {
    let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, step.axis)
        .into_iter()
        .filter(|&candidate| matches_node_test(ctx.doc, candidate, step.axis, &step.test))
        .collect();
    for pred in &step.predicates {
        candidates = filter(ctx, candidates, pred)?;
    }
    Ok(candidates)
}

/// Keep the nodes for which the predicate holds; a number predicate is
/// true when it equals the node's position
fn filter<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<NodeId>,
    pred: &CompiledExpr,
) -> Result<Vec<NodeId>, EvalError> {
    let size = nodes.len();
    let mut filtered = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let pred_ctx = ctx.with_node(node, i + 1, size);
        let include = match evaluate_compiled(pred, &pred_ctx)? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            filtered.push(node);
        }
    }
    Ok(filtered)
}

fn binary<D: DocumentAccess + ?Sized>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> XPathValue {
    let arithmetic = |f: fn(f64, f64) -> f64| XPathValue::Number(f(left.to_number(doc), right.to_number(doc)));
    match op {
        BinaryOp::Add => arithmetic(|a, b| a + b),
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Div => arithmetic(|a, b| a / b),
        // Truncating remainder, sign of the dividend
        BinaryOp::Mod => arithmetic(|a, b| a % b),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        _ => XPathValue::Boolean(compare(doc, op, left, right)),
    }
}

/// XPath 1.0 comparison: a node-set compares true if any of its nodes does
fn compare<D: DocumentAccess + ?Sized>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let string_of = |id: NodeId| XPathValue::String(node_string_value(doc, id));
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_values: Vec<XPathValue> = r.iter().map(|&id| string_of(id)).collect();
            l.iter().any(|&id| {
                let value = string_of(id);
                right_values.iter().any(|rv| compare_atomic(doc, op, &value, rv))
            })
        }
        (XPathValue::NodeSet(_), XPathValue::Boolean(_)) | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => {
            compare_atomic(
                doc,
                op,
                &XPathValue::Boolean(left.to_boolean()),
                &XPathValue::Boolean(right.to_boolean()),
            )
        }
        (XPathValue::NodeSet(nodes), other) => nodes.iter().any(|&id| compare_atomic(doc, op, &string_of(id), other)),
        (other, XPathValue::NodeSet(nodes)) => nodes.iter().any(|&id| compare_atomic(doc, op, other, &string_of(id))),
        _ => compare_atomic(doc, op, left, right),
    }
}

fn compare_atomic<D: DocumentAccess + ?Sized>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let is = |pred: fn(&XPathValue) -> bool| pred(left) || pred(right);
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = if is(|v| matches!(v, XPathValue::Boolean(_))) {
                left.to_boolean() == right.to_boolean()
            } else if is(|v| matches!(v, XPathValue::Number(_))) {
                left.to_number(doc) == right.to_number(doc)
            } else {
                left.to_string_value(doc) == right.to_string_value(doc)
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (l, r) = (left.to_number(doc), right.to_number(doc));
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                BinaryOp::GtEq => l >= r,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::xpath::NamespaceBindings;

    fn eval(doc: &XmlDocument, xpath: &str) -> Result<XPathValue, EvalError> {
        let compiled = CompiledExpression::compile(xpath, &NamespaceBindings::new()).unwrap();
        evaluate(doc, 0, &compiled)
    }

    fn names(doc: &XmlDocument, xpath: &str) -> Vec<String> {
        match eval(doc, xpath).unwrap() {
            XPathValue::NodeSet(ids) => ids
                .iter()
                .map(|&id| format!("{}{}", doc.local_name(id), doc.value(id)))
                .collect(),
            other => panic!("expected node-set, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_path() {
        let doc = XmlDocument::parse(b"<root><child/></root>").unwrap();
        assert_eq!(names(&doc, "/root/child"), ["child"]);
        assert_eq!(eval(&doc, "/").unwrap(), XPathValue::NodeSet(vec![0]));
    }

    #[test]
    fn test_descendant() {
        let doc = XmlDocument::parse(b"<root><a><b/></a></root>").unwrap();
        assert_eq!(names(&doc, "//b"), ["b"]);
    }

    #[test]
    fn test_step_predicates_are_per_context_node() {
        let doc = XmlDocument::parse(b"<r><p><i n='1'/><i n='2'/></p><p><i n='3'/></p></r>").unwrap();
        assert_eq!(eval(&doc, "count(//i[1])").unwrap(), XPathValue::Number(2.0));
        assert_eq!(eval(&doc, "count((//i)[1])").unwrap(), XPathValue::Number(1.0));
        assert_eq!(names(&doc, "//p/i[last()]/@n"), ["n2", "n3"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = XmlDocument::parse(b"<a><b><c/></b></a>").unwrap();
        assert_eq!(names(&doc, "//c/ancestor::*[1]"), ["b"]);
        assert_eq!(names(&doc, "//c/ancestor::*[last()]"), ["a"]);
    }

    #[test]
    fn test_comparisons() {
        let doc = XmlDocument::parse(b"<r><v>1</v><v>5</v><w>x</w></r>").unwrap();
        assert_eq!(eval(&doc, "//v = 5").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//v != 5").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//v > 4").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//v > 5").unwrap(), XPathValue::Boolean(false));
        assert_eq!(eval(&doc, "//w = 'x'").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "//missing = false()").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "'1' = 1.0").unwrap(), XPathValue::Boolean(true));
        assert_eq!(eval(&doc, "0 div 0 = 0 div 0").unwrap(), XPathValue::Boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        let doc = XmlDocument::parse(b"<r/>").unwrap();
        assert_eq!(eval(&doc, "7 mod -3").unwrap(), XPathValue::Number(1.0));
        assert_eq!(eval(&doc, "-7 mod 3").unwrap(), XPathValue::Number(-1.0));
        assert_eq!(eval(&doc, "1 div 0").unwrap(), XPathValue::Number(f64::INFINITY));
        assert_eq!(eval(&doc, "2 + 3 * 4").unwrap(), XPathValue::Number(14.0));
    }

    #[test]
    fn test_and_short_circuits() {
        let doc = XmlDocument::parse(b"<r/>").unwrap();
        assert_eq!(eval(&doc, "false() and id('x')").unwrap(), XPathValue::Boolean(false));
        assert_eq!(eval(&doc, "true() or id('x')").unwrap(), XPathValue::Boolean(true));
        assert!(eval(&doc, "true() and id('x')").is_err());
    }

    #[test]
    fn test_union_of_non_node_sets_is_an_error() {
        let doc = XmlDocument::parse(b"<r/>").unwrap();
        let err = eval(&doc, "1 | //r").unwrap_err();
        assert_eq!(err.message, "'|' requires a node-set, got number");
        assert!(eval(&doc, "'a'/b").is_err());
        assert!(eval(&doc, "(1)[1]").is_err());
    }

    #[test]
    fn test_union_is_document_ordered() {
        let doc = XmlDocument::parse(b"<r><a/><b/><c/></r>").unwrap();
        assert_eq!(names(&doc, "//c | //a | //a"), ["a", "c"]);
    }
}
