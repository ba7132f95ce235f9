//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions. Abbreviations are
//! expanded while parsing: `.` is `self::node()`, `..` is `parent::node()`,
//! `@` is the attribute axis and `//` is `/descendant-or-self::node()/`.

use super::lexer::{Lexer, Token};
use crate::error::CompileError;

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Location step applied to every node of a node-set (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Variable reference
    Variable(String),
    /// Location step from the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn node(axis: Axis) -> Self {
        Step {
            axis,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Any node of the axis' principal kind (*)
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text and CDATA nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction('target'?)
    ProcessingInstruction(Option<String>),
}

/// Deepest nesting of groups, predicates, arguments and negations
const MAX_NESTING: usize = 64;

/// Most operators and location steps one expression may contain
const MAX_DEPTH: usize = 256;

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    position: usize,
    nesting: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        let position = lexer.token_start();
        Ok(Parser {
            lexer,
            current,
            position,
            nesting: 0,
            depth: 0,
        })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr, CompileError> {
        let expr = self.parse_or_expr()?;
        if self.current != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    /// Advance to next token
    fn advance(&mut self) -> Result<(), CompileError> {
        self.current = self.lexer.next_token()?;
        self.position = self.lexer.token_start();
        Ok(())
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), CompileError> {
        if self.current != token {
            return Err(CompileError::syntax(
                self.position,
                format!("expected {what}, found {}", describe(&self.current)),
            ));
        }
        self.advance()
    }

    fn unexpected(&self) -> CompileError {
        CompileError::syntax(self.position, format!("unexpected {}", describe(&self.current)))
    }

    fn too_deep(&self) -> CompileError {
        CompileError::syntax(self.position, "expression nested too deeply")
    }

    /// Enter one level of parser recursion
    fn nest(&mut self) -> Result<(), CompileError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(())
    }

    /// Account for `levels` more AST nodes wrapping an existing expression
    fn deepen(&mut self, levels: usize) -> Result<(), CompileError> {
        self.depth += levels;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    fn parse_or_expr(&mut self) -> Result<Expr, CompileError> {
        self.nest()?;
        let mut left = self.parse_and_expr()?;
        while self.current == Token::Or {
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        self.nesting -= 1;
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality_expr()?;
        while self.current == Token::And {
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, CompileError> {
        if self.current == Token::Minus {
            self.nest()?;
            self.advance()?;
            let expr = self.parse_unary_expr()?;
            self.nesting -= 1;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_path_expr()?;
        while self.current == Token::Pipe {
            self.deepen(1)?;
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Whether the current token can begin a location step
    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Name(_)
                | Token::QName { .. }
                | Token::PrefixWildcard(_)
                | Token::NodeType(_)
                | Token::Star
                | Token::At
                | Token::Dot
                | Token::DoubleDot
                | Token::Axis(_)
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, CompileError> {
        let mut expr = match self.current {
            Token::Slash => {
                self.advance()?;
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                self.deepen(1)?;
                Expr::Path(Box::new(Expr::Root), Box::new(self.parse_step()?))
            }
            Token::DoubleSlash => {
                self.deepen(2)?;
                self.advance()?;
                let descendants = Expr::Path(Box::new(Expr::Root), Box::new(Step::node(Axis::DescendantOrSelf)));
                Expr::Path(Box::new(descendants), Box::new(self.parse_step()?))
            }
            _ if self.at_step_start() => Expr::Step(Box::new(self.parse_step()?)),
            _ => {
                let mut expr = self.parse_primary_expr()?;
                while self.current == Token::LeftBracket {
                    self.deepen(1)?;
                    let predicate = self.parse_predicate()?;
                    expr = Expr::Filter(Box::new(expr), Box::new(predicate));
                }
                expr
            }
        };

        loop {
            match self.current {
                Token::Slash => {
                    self.deepen(1)?;
                    self.advance()?;
                    expr = Expr::Path(Box::new(expr), Box::new(self.parse_step()?));
                }
                Token::DoubleSlash => {
                    self.deepen(2)?;
                    self.advance()?;
                    let descendants = Expr::Path(Box::new(expr), Box::new(Step::node(Axis::DescendantOrSelf)));
                    expr = Expr::Path(Box::new(descendants), Box::new(self.parse_step()?));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, CompileError> {
        match self.current.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance()?;
                let name = match self.current.clone() {
                    Token::Name(name) => name,
                    Token::QName { prefix, local } => format!("{prefix}:{local}"),
                    _ => return Err(CompileError::syntax(self.position, "expected variable name after '$'")),
                };
                self.advance()?;
                Ok(Expr::Variable(name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_or_expr()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(expr)
            }
            Token::FunctionName(name) => {
                self.advance()?;
                self.expect(Token::LeftParen, "'('")?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse a location step
    fn parse_step(&mut self) -> Result<Step, CompileError> {
        let axis = match self.current.clone() {
            Token::Dot => {
                self.advance()?;
                return Ok(Step::node(Axis::Self_));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(Step::node(Axis::Parent));
            }
            Token::At => {
                self.advance()?;
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(&name)
                    .ok_or_else(|| CompileError::syntax(self.position, format!("unknown axis '{name}'")))?;
                self.advance()?;
                self.expect(Token::DoubleColon, "'::'")?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.current == Token::LeftBracket {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, CompileError> {
        let test = match self.current.clone() {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name),
            Token::QName { prefix, local } => NodeTest::QName(prefix, local),
            Token::PrefixWildcard(prefix) => NodeTest::NamespaceWildcard(prefix),
            Token::NodeType(kind) => {
                self.advance()?;
                self.expect(Token::LeftParen, "'('")?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.current.clone() {
                        Token::String(target) => {
                            self.advance()?;
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(Token::RightParen, "')'")?;
                return Ok(test);
            }
            _ => {
                return Err(CompileError::syntax(
                    self.position,
                    format!("expected node test, found {}", describe(&self.current)),
                ))
            }
        };
        self.advance()?;
        Ok(test)
    }

    fn parse_predicate(&mut self) -> Result<Expr, CompileError> {
        self.expect(Token::LeftBracket, "'['")?;
        let predicate = self.parse_or_expr()?;
        self.expect(Token::RightBracket, "']'")?;
        Ok(predicate)
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            args.push(self.parse_or_expr()?);
            while self.current == Token::Comma {
                self.advance()?;
                args.push(self.parse_or_expr()?);
            }
        }
        self.expect(Token::RightParen, "')'")?;
        Ok(args)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Eof => "end of expression".to_string(),
        Token::Name(name) => format!("name '{name}'"),
        Token::String(s) => format!("string '{s}'"),
        Token::Number(n) => format!("number {n}"),
        other => format!("{other:?}"),
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, CompileError> {
    Parser::new(input)?.parse()
}
