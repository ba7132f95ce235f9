//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens, applying the XPath 1.0
//! disambiguation rules: after an operand, `*` is the multiply operator and
//! the names `and`, `or`, `mod`, `div` are operators; a name followed by `(`
//! is a function name or node type, a name followed by `::` an axis name.

use crate::core::chars::{is_name_char, is_name_start_char};
use crate::error::CompileError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * (name test or multiply, decided by the parser)
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),                               // NCName
    QName { prefix: String, local: String },    // prefix:local
    PrefixWildcard(String),                     // prefix:*
    NodeType(String),                           // node, text, comment, processing-instruction
    FunctionName(String),                       // name followed by (

    // Axis
    Axis(String), // child, descendant, ... (followed by ::)

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            token_start: 0,
            after_operand: false,
        }
    }

    /// Byte offset where the most recent token started
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c @ (' ' | '\t' | '\n' | '\r')) = self.peek() {
            self.advance(c.len_utf8());
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(self.token_start, message)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        let token = self.scan()?;
        self.after_operand = match &token {
            Token::Number(_)
            | Token::String(_)
            | Token::Name(_)
            | Token::QName { .. }
            | Token::PrefixWildcard(_)
            | Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DoubleDot => true,
            Token::Star => !self.after_operand,
            _ => false,
        };
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace();
        self.token_start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        let (token, len) = match c {
            '/' if self.peek_at(1) == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '.' if self.peek_at(1) == Some('.') => (Token::DoubleDot, 2),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => return Ok(self.read_number()),
            '.' => (Token::Dot, 1),
            '@' => (Token::At, 1),
            '|' => (Token::Pipe, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '=' => (Token::Eq, 1),
            '!' if self.peek_at(1) == Some('=') => (Token::NotEq, 2),
            '!' => return Err(self.error("expected '=' after '!'")),
            '<' if self.peek_at(1) == Some('=') => (Token::LtEq, 2),
            '<' => (Token::Lt, 1),
            '>' if self.peek_at(1) == Some('=') => (Token::GtEq, 2),
            '>' => (Token::Gt, 1),
            '(' => (Token::LeftParen, 1),
            ')' => (Token::RightParen, 1),
            '[' => (Token::LeftBracket, 1),
            ']' => (Token::RightBracket, 1),
            ',' => (Token::Comma, 1),
            '$' => (Token::Dollar, 1),
            ':' if self.peek_at(1) == Some(':') => (Token::DoubleColon, 2),
            '"' | '\'' => return self.read_string(c),
            '0'..='9' => return Ok(self.read_number()),
            _ if is_ncname_start(c) => return Ok(self.read_name_or_keyword()),
            _ => return Err(self.error(format!("unexpected character '{c}'"))),
        };
        self.advance(len);
        Ok(token)
    }

    /// Read a number literal: `Digits ('.' Digits?)?` or `'.' Digits`
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.skip_digits();
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            self.advance(1);
            self.skip_digits();
        }
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
    }

    /// Read a string literal; there are no escapes in XPath 1.0
    fn read_string(&mut self, quote: char) -> Result<Token, CompileError> {
        self.advance(1);
        let start = self.pos;
        let len = self
            .remaining()
            .find(quote)
            .ok_or_else(|| self.error("unterminated string literal"))?;
        let value = self.input[start..start + len].to_string();
        self.advance(len + 1);
        Ok(Token::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ':' || !is_name_char(c) {
                break;
            }
            self.advance(c.len_utf8());
        }
        &self.input[start..self.pos]
    }

    /// Read a name or keyword
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.after_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:* and prefix:local allow no whitespace around the colon
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::PrefixWildcard(name.to_string());
            }
            if self.peek_at(1).is_some_and(is_ncname_start) {
                self.advance(1);
                let local = self.read_ncname();
                let resume = self.pos;
                self.skip_whitespace();
                if self.peek() == Some('(') {
                    return Token::FunctionName(format!("{name}:{local}"));
                }
                self.pos = resume;
                return Token::QName {
                    prefix: name.to_string(),
                    local: local.to_string(),
                };
            }
        }

        let resume = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            return Token::Axis(name.to_string());
        }
        if self.peek() == Some('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name.to_string()),
                _ => Token::FunctionName(name.to_string()),
            };
        }
        self.pos = resume;
        Token::Name(name.to_string())
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token()? {
                Token::Eof => return Ok(tokens),
                token => tokens.push(token),
            }
        }
    }
}

fn is_ncname_start(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(tokens("/root/child"), [Token::Slash, name("root"), Token::Slash, name("child")]);
    }

    #[test]
    fn test_descendant() {
        assert_eq!(tokens("//item"), [Token::DoubleSlash, name("item")]);
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            [
                name("item"),
                Token::LeftBracket,
                Token::At,
                name("id"),
                Token::Eq,
                Token::String("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis() {
        assert_eq!(
            tokens("child :: element"),
            [Token::Axis("child".to_string()), Token::DoubleColon, name("element")]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("p:node/q:*"),
            [
                Token::QName {
                    prefix: "p".to_string(),
                    local: "node".to_string()
                },
                Token::Slash,
                Token::PrefixWildcard("q".to_string()),
            ]
        );
    }

    #[test]
    fn test_operator_names_depend_on_context() {
        assert_eq!(tokens("and and and"), [name("and"), Token::And, name("and")]);
        assert_eq!(tokens("div div div"), [name("div"), Token::Div, name("div")]);
        assert_eq!(tokens("a mod 2"), [name("a"), Token::Mod, Token::Number(2.0)]);
    }

    #[test]
    fn test_functions_and_node_types() {
        assert_eq!(
            tokens("count (text())"),
            [
                Token::FunctionName("count".to_string()),
                Token::LeftParen,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("1.5 .5 3."), [Token::Number(1.5), Token::Number(0.5), Token::Number(3.0)]);
    }

    #[test]
    fn test_hyphenated_names() {
        assert_eq!(tokens("a-b - c"), [name("a-b"), Token::Minus, name("c")]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("a = 'oops").tokenize().unwrap_err();
        assert_eq!(
            err,
            CompileError::Syntax {
                position: 4,
                message: "unterminated string literal".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_characters() {
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("a # b").tokenize().is_err());
    }
}
