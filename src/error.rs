//! Error types
//!
//! One error type per pipeline stage, plus [`QueryError`] which a full
//! load → parse → compile → select run returns.

use std::fmt;

/// Location of a parse error in the (UTF-8) input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
}

impl Position {
    /// Compute line/column for a byte offset.
    pub fn from_offset(input: &[u8], offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input[..offset];
        let line = memchr::memchr_iter(b'\n', before).count() + 1;
        let line_start = memchr::memrchr(b'\n', before).map(|p| p + 1).unwrap_or(0);
        let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
        Position { offset, line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// What went wrong while parsing XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid UTF-16 input")]
    InvalidUtf16,
    #[error("character U+{0:04X} is not allowed in XML")]
    InvalidChar(u32),
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("tag mismatch: <{expected}> closed with </{found}>")]
    TagMismatch { expected: String, found: String },
    #[error("unexpected end tag </{0}>")]
    UnexpectedEndTag(String),
    #[error("unclosed tag <{0}>")]
    UnclosedTag(String),
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),
    #[error("'<' is not allowed in attribute values")]
    LtInAttributeValue,
    #[error("unknown entity '&{0};'")]
    UnknownEntity(String),
    #[error("malformed character or entity reference")]
    MalformedReference,
    #[error("'--' is not allowed inside comments")]
    DoubleHyphenInComment,
    #[error("']]>' is not allowed in text content")]
    CDataEndInText,
    #[error("XML declaration is only allowed at the start of the document")]
    MisplacedDeclaration,
    #[error("processing instruction target '{0}' is reserved")]
    ReservedPiTarget(String),
    #[error("DOCTYPE is only allowed once, before the root element")]
    MisplacedDoctype,
    #[error("document has no root element")]
    NoRootElement,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("{0} is not allowed outside the root element")]
    OutsideRoot(&'static str),
    #[error("namespace prefix '{0}' is not declared")]
    UndeclaredPrefix(String),
    #[error("invalid namespace declaration: {0}")]
    InvalidNamespaceDeclaration(String),
}

/// Malformed XML input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {position}")]
pub struct ParseError {
    pub position: Position,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn at(input: &[u8], offset: usize, kind: ParseErrorKind) -> Self {
        ParseError {
            position: Position::from_offset(input, offset),
            kind,
        }
    }

    /// Human readable description without the position.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// An XPath expression could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("namespace prefix '{prefix}' is not bound")]
    UnboundPrefix { prefix: String },
    #[error("unknown function '{name}()'")]
    UnknownFunction { name: String },
    #[error("variable '${name}' is not bound")]
    UnboundVariable { name: String },
}

impl CompileError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Runtime failure while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        EvalError {
            message: message.into(),
        }
    }
}

/// Fetching a document failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("request to {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("document load was cancelled")]
    Cancelled,
}

/// A namespace binding map was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("binding for prefix '{0}' must be a non-empty namespace URI")]
    EmptyUri(String),
}

/// Neither or both of inline content and content URL were given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("exactly one of content or content_url must be set, got neither")]
    Missing,
    #[error("exactly one of content or content_url must be set, got both")]
    Ambiguous,
}

/// Any failure of a complete query run.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("cannot load content: {0}")]
    Load(#[from] LoadError),
    #[error("cannot parse content: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to compile expression: {0}")]
    Compile(#[from] CompileError),
    #[error("failed to evaluate expression: {0}")]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Binding(#[from] BindingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_counts_lines_and_columns() {
        let input = b"<a>\n  <b>\n</a>";
        let pos = Position::from_offset(input, 6);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
        assert_eq!(pos.offset, 6);
    }

    #[test]
    fn parse_error_message_names_kind_and_position() {
        let err = ParseError::at(b"<a>", 3, ParseErrorKind::UnclosedTag("a".into()));
        assert_eq!(err.message(), "unclosed tag <a>");
        assert_eq!(err.to_string(), "unclosed tag <a> at line 1, column 4");
    }

    #[test]
    fn compile_error_wraps_into_query_error() {
        let err: QueryError = CompileError::UnboundPrefix {
            prefix: "p".into(),
        }
        .into();
        assert!(matches!(err, QueryError::Compile(CompileError::UnboundPrefix { .. })));
        assert!(err.to_string().contains("'p'"));
    }
}
