//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat stack program. Everything
//! that depends only on the expression and its namespace bindings is settled
//! here: prefixes are resolved to URIs, function names to [`Function`], and
//! variable references are rejected.

use std::fmt;

use super::bindings::NamespaceBindings;
use super::functions::Function;
use super::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::CompileError;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace a node-set with the result of a location step from each node
    Step(Box<CompiledStep>),
    /// Filter a node-set (in document order) by a predicate
    Predicate(Box<CompiledExpr>),
    /// Union two node-sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function with the given number of arguments
    Call(Function, usize),
    /// Binary operation on the top two values
    Binary(BinaryOp),
    /// `and`: evaluate the right operand only if the left one is true
    And(Box<CompiledExpr>),
    /// `or`: evaluate the right operand only if the left one is false
    Or(Box<CompiledExpr>),
    /// Negate
    Negate,
}

/// Location step with resolved node test
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    pub axis: Axis,
    pub test: CompiledNodeTest,
    pub predicates: Vec<CompiledExpr>,
}

/// Compiled node test; names carry the namespace URI, never a prefix
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    /// `*`
    Any,
    /// Expanded name; an empty URI means no namespace
    Name { namespace_uri: String, local: String },
    /// `prefix:*`
    Namespace(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

struct Compiler<'b> {
    bindings: &'b NamespaceBindings,
}

impl Compiler<'_> {
    fn compile(&self, expr: &Expr) -> Result<CompiledExpr, CompileError> {
        let mut ops = Vec::new();
        self.compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr { ops })
    }

    fn compile_expr(&self, expr: &Expr, ops: &mut Vec<Op>) -> Result<(), CompileError> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => return Err(CompileError::UnboundVariable { name: name.clone() }),
            Expr::Negate(inner) => {
                self.compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary(left, BinaryOp::And, right) => {
                self.compile_expr(left, ops)?;
                ops.push(Op::And(Box::new(self.compile(right)?)));
            }
            Expr::Binary(left, BinaryOp::Or, right) => {
                self.compile_expr(left, ops)?;
                ops.push(Op::Or(Box::new(self.compile(right)?)));
            }
            Expr::Binary(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                self.compile_expr(base, ops)?;
                ops.push(Op::Step(Box::new(self.compile_step(step)?)));
            }
            Expr::Filter(base, pred) => {
                self.compile_expr(base, ops)?;
                ops.push(Op::Predicate(Box::new(self.compile(pred)?)));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Op::Step(Box::new(self.compile_step(step)?)));
            }
            Expr::Function(name, args) => {
                let function =
                    Function::from_name(name).ok_or_else(|| CompileError::UnknownFunction { name: name.clone() })?;
                for arg in args {
                    self.compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(function, args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(&self, step: &Step) -> Result<CompiledStep, CompileError> {
        let test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(local) => {
                // The default binding applies to element names only
                let namespace_uri = match step.axis {
                    Axis::Attribute | Axis::Namespace => "",
                    _ => self.bindings.default_uri().unwrap_or(""),
                };
                CompiledNodeTest::Name {
                    namespace_uri: namespace_uri.to_string(),
                    local: local.clone(),
                }
            }
            NodeTest::QName(prefix, local) => CompiledNodeTest::Name {
                namespace_uri: self.resolve(prefix)?,
                local: local.clone(),
            },
            NodeTest::NamespaceWildcard(prefix) => CompiledNodeTest::Namespace(self.resolve(prefix)?),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(target) => CompiledNodeTest::ProcessingInstruction(target.clone()),
        };

        let predicates = step
            .predicates
            .iter()
            .map(|pred| self.compile(pred))
            .collect::<Result<_, _>>()?;

        Ok(CompiledStep {
            axis: step.axis,
            test,
            predicates,
        })
    }

    fn resolve(&self, prefix: &str) -> Result<String, CompileError> {
        self.bindings
            .resolve(prefix)
            .map(str::to_string)
            .ok_or_else(|| CompileError::UnboundPrefix {
                prefix: prefix.to_string(),
            })
    }
}

/// An XPath expression compiled against a set of namespace bindings
///
/// Immutable once built, so it can be cached and shared between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    program: CompiledExpr,
}

impl CompiledExpression {
    /// Parse and compile `source`, resolving its prefixes with `bindings`
    pub fn compile(source: &str, bindings: &NamespaceBindings) -> Result<Self, CompileError> {
        let expr = parser::parse(source)?;
        let program = Compiler { bindings }.compile(&expr)?;
        tracing::debug!(expression = source, ops = program.ops.len(), "compiled XPath expression");
        Ok(CompiledExpression {
            source: source.to_string(),
            program,
        })
    }

    /// The expression text this was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn program(&self) -> &CompiledExpr {
        &self.program
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<CompiledExpression, CompileError> {
        CompiledExpression::compile(source, &NamespaceBindings::new())
    }

    fn first_step(compiled: &CompiledExpression) -> &CompiledStep {
        compiled
            .program()
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Step(step) => Some(step.as_ref()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.program().ops[0], Op::Root));
        assert_eq!(compiled.to_string(), "/root");
    }

    #[test]
    fn test_prefix_resolves_to_uri() {
        let bindings = NamespaceBindings::new().with("p", "urn:p").unwrap();
        let compiled = CompiledExpression::compile("p:item", &bindings).unwrap();
        assert_eq!(
            first_step(&compiled).test,
            CompiledNodeTest::Name {
                namespace_uri: "urn:p".into(),
                local: "item".into()
            }
        );
    }

    #[test]
    fn test_default_binding_applies_to_elements_only() {
        let bindings = NamespaceBindings::new().with("", "urn:d").unwrap();
        let element = CompiledExpression::compile("item", &bindings).unwrap();
        assert!(matches!(
            &first_step(&element).test,
            CompiledNodeTest::Name { namespace_uri, .. } if namespace_uri == "urn:d"
        ));
        let attribute = CompiledExpression::compile("@id", &bindings).unwrap();
        assert!(matches!(
            &first_step(&attribute).test,
            CompiledNodeTest::Name { namespace_uri, .. } if namespace_uri.is_empty()
        ));
    }

    #[test]
    fn test_unbound_prefix() {
        assert_eq!(
            compile("//q:item").unwrap_err(),
            CompileError::UnboundPrefix { prefix: "q".into() }
        );
        assert!(compile("@xml:lang").is_ok());
    }

    #[test]
    fn test_unknown_function_and_variable() {
        assert_eq!(
            compile("matches(., 'x')").unwrap_err(),
            CompileError::UnknownFunction { name: "matches".into() }
        );
        assert_eq!(
            compile("//a[@id = $id]").unwrap_err(),
            CompileError::UnboundVariable { name: "id".into() }
        );
    }

    #[test]
    fn compiled_expression_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledExpression>();
    }
}
