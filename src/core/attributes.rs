//! XML Attribute Parsing
//!
//! Reads `name = "value"` pairs inside a start tag.

use std::borrow::Cow;

use super::entities::{decode, DecodeMode};
use super::scanner::Scanner;
use crate::error::{ParseError, ParseErrorKind};

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written
    pub name: &'a str,
    /// Value with references decoded and whitespace normalized
    pub value: Cow<'a, str>,
    /// Byte offset of the name in the input
    pub offset: usize,
}

impl<'a> Attribute<'a> {
    /// Namespace prefix (before the colon), if any
    pub fn prefix(&self) -> Option<&'a str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Local name (after the colon)
    pub fn local_name(&self) -> &'a str {
        self.name.split_once(':').map_or(self.name, |(_, local)| local)
    }

    /// `xmlns` or `xmlns:*`
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

/// Read one attribute starting at the scanner position
///
/// The scanner must be positioned on the attribute name.
pub fn read_attribute<'a>(scanner: &mut Scanner<'a>) -> Result<Attribute<'a>, ParseError> {
    let offset = scanner.position();
    let name = scanner
        .read_name()
        .ok_or_else(|| scanner.error_here(scanner.eof_or(ParseErrorKind::Expected("attribute name"))))?;

    scanner.skip_whitespace();
    scanner.expect("=", "'=' after attribute name")?;
    scanner.skip_whitespace();

    let quote = match scanner.peek() {
        Some(q @ (b'"' | b'\'')) => q,
        _ => return Err(scanner.error_here(scanner.eof_or(ParseErrorKind::Expected("quoted attribute value")))),
    };
    scanner.advance(1);
    let start = scanner.position();
    let end = scanner
        .find_byte(quote)
        .ok_or_else(|| scanner.error_at(start, ParseErrorKind::UnexpectedEof))?;

    let raw = scanner.slice(start, end);
    if let Some(lt) = memchr::memchr(b'<', raw.as_bytes()) {
        return Err(scanner.error_at(start + lt, ParseErrorKind::LtInAttributeValue));
    }
    let value = decode(raw, DecodeMode::Attribute).map_err(|(at, kind)| scanner.error_at(start + at, kind))?;

    scanner.advance(end + 1 - start);
    Ok(Attribute { name, value, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Result<Attribute<'_>, ParseError> {
        read_attribute(&mut Scanner::new(input))
    }

    #[test]
    fn test_simple_attribute() {
        let attr = read(r#"id="42" rest"#).unwrap();
        assert_eq!(attr.name, "id");
        assert_eq!(attr.value, "42");
        assert_eq!(attr.offset, 0);
    }

    #[test]
    fn test_single_quotes_and_spacing() {
        let attr = read("x:lang = 'a &amp; b'").unwrap();
        assert_eq!(attr.prefix(), Some("x"));
        assert_eq!(attr.local_name(), "lang");
        assert_eq!(attr.value, "a & b");
    }

    #[test]
    fn test_namespace_declaration() {
        assert!(read(r#"xmlns="u""#).unwrap().is_namespace_declaration());
        assert!(read(r#"xmlns:p="u""#).unwrap().is_namespace_declaration());
        assert!(!read(r#"xmlnsx="u""#).unwrap().is_namespace_declaration());
    }

    #[test]
    fn test_lt_in_value() {
        let err = read(r#"a="x<y""#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::LtInAttributeValue);
        assert_eq!(err.position.offset, 4);
    }

    #[test]
    fn test_missing_quote() {
        assert_eq!(read("a=1").unwrap_err().kind, ParseErrorKind::Expected("quoted attribute value"));
        assert_eq!(read("a=\"1").unwrap_err().kind, ParseErrorKind::UnexpectedEof);
    }
}
