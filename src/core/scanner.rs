//! Cursor over validated UTF-8 XML input
//!
//! Delimiter searches use memchr (SIMD when available). Every delimiter the
//! reader searches for is ASCII, so slicing at the returned offsets always
//! lands on a char boundary.

use memchr::{memchr, memmem};

use super::chars::{is_name_char, is_name_start_char, is_whitespace};
use crate::error::{ParseError, ParseErrorKind};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Slice of the input between two byte offsets
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace, reporting whether any was present
    #[inline]
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
        self.pos > start
    }

    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Consume `needle` or fail with `Expected(what)`
    pub fn expect(&mut self, needle: &str, what: &'static str) -> Result<(), ParseError> {
        if self.starts_with(needle) {
            self.advance(needle.len());
            Ok(())
        } else {
            Err(self.error_here(self.eof_or(ParseErrorKind::Expected(what))))
        }
    }

    /// Absolute offset of the next occurrence of a byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining().as_bytes()).map(|i| self.pos + i)
    }

    /// Absolute offset of the next occurrence of a delimiter sequence
    #[inline]
    pub fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(self.remaining().as_bytes(), needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Read an XML `Name`, returning `None` if none starts here
    pub fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut chars = self.remaining().char_indices();
        match chars.next() {
            Some((_, c)) if is_name_start_char(c) => {}
            _ => return None,
        }
        let mut end = self.input.len();
        for (i, c) in chars {
            if !is_name_char(c) {
                end = start + i;
                break;
            }
        }
        self.pos = end;
        Some(&self.input[start..end])
    }

    /// Build an error at an absolute offset
    pub fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::at(self.input.as_bytes(), offset, kind)
    }

    pub fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(self.pos, kind)
    }

    /// `UnexpectedEof` when the input is exhausted, `kind` otherwise
    pub fn eof_or(&self, kind: ParseErrorKind) -> ParseErrorKind {
        if self.is_eof() {
            ParseErrorKind::UnexpectedEof
        } else {
            kind
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_delimiters() {
        let scanner = Scanner::new("hello <!-- x --> <world>");
        assert_eq!(scanner.find_byte(b'<'), Some(6));
        assert_eq!(scanner.find("-->"), Some(13));
    }

    #[test]
    fn reads_unicode_names() {
        let mut scanner = Scanner::new("données-1 rest");
        assert_eq!(scanner.read_name(), Some("données-1"));
        assert!(scanner.skip_whitespace());
        assert_eq!(scanner.remaining(), "rest");
    }

    #[test]
    fn name_cannot_start_with_digit() {
        let mut scanner = Scanner::new("1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn expect_reports_eof() {
        let mut scanner = Scanner::new("ab");
        scanner.advance(2);
        let err = scanner.expect(">", "'>'").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }
}
