//! Zero-Copy Slice Parser
//!
//! Pull parser over a validated UTF-8 string. Markup is checked strictly as it
//! is read: names, character classes, references, comment and CDATA rules.
//! Nesting and namespace checks live in the tree builder, which sees the
//! whole element stack.

use memchr::memmem;

use super::events::{Positioned, StartElement, XmlEvent};
use crate::core::attributes::read_attribute;
use crate::core::chars::is_xml_char;
use crate::core::entities::{decode, normalize_newlines, DecodeMode};
use crate::core::scanner::Scanner;
use crate::error::{ParseError, ParseErrorKind};

/// Zero-copy XML reader from a string slice
pub struct SliceReader<'a> {
    scanner: Scanner<'a>,
    failed: bool,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            scanner: Scanner::new(input),
            failed: false,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Build an error positioned in this reader's input
    pub fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        self.scanner.error_at(offset, kind)
    }

    /// Get the next XML event, `None` at end of input
    pub fn next_event(&mut self) -> Result<Option<Positioned<'a>>, ParseError> {
        if self.scanner.is_eof() {
            return Ok(None);
        }
        let offset = self.scanner.position();

        let event = if self.scanner.peek() != Some(b'<') {
            self.read_text(offset)?
        } else if self.scanner.starts_with("<?") {
            self.read_processing_instruction(offset)?
        } else if self.scanner.starts_with("<!--") {
            self.read_comment(offset)?
        } else if self.scanner.starts_with("<![CDATA[") {
            self.read_cdata(offset)?
        } else if self.scanner.starts_with("<!DOCTYPE") {
            self.read_doctype(offset)?
        } else if self.scanner.starts_with("<!") {
            return Err(self.scanner.error_here(ParseErrorKind::Expected("comment, CDATA section or DOCTYPE")));
        } else if self.scanner.starts_with("</") {
            self.read_end_tag()?
        } else {
            self.read_start_tag()?
        };

        Ok(Some(Positioned { offset, event }))
    }

    fn read_text(&mut self, offset: usize) -> Result<XmlEvent<'a>, ParseError> {
        let end = self.scanner.find_byte(b'<').unwrap_or(offset + self.scanner.remaining().len());
        let raw = self.scanner.slice(offset, end);
        if let Some(i) = memmem::find(raw.as_bytes(), b"]]>") {
            return Err(self.error_at(offset + i, ParseErrorKind::CDataEndInText));
        }
        let text = decode(raw, DecodeMode::Text).map_err(|(i, kind)| self.error_at(offset + i, kind))?;
        self.scanner.advance(end - offset);
        Ok(XmlEvent::Text(text))
    }

    fn read_processing_instruction(&mut self, offset: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self.scanner.read_name().ok_or_else(|| {
            self.scanner
                .error_here(self.scanner.eof_or(ParseErrorKind::Expected("processing instruction target")))
        })?;

        if target == "xml" && offset != 0 {
            return Err(self.error_at(offset, ParseErrorKind::MisplacedDeclaration));
        }
        if target != "xml" && target.eq_ignore_ascii_case("xml") {
            return Err(self.error_at(offset + 2, ParseErrorKind::ReservedPiTarget(target.to_string())));
        }

        let content: &'a str = if self.scanner.starts_with("?>") {
            ""
        } else {
            if !self.scanner.skip_whitespace() {
                return Err(self.scanner.error_here(
                    self.scanner
                        .eof_or(ParseErrorKind::Expected("whitespace after processing instruction target")),
                ));
            }
            let start = self.scanner.position();
            let end = self
                .scanner
                .find("?>")
                .ok_or_else(|| self.error_at(offset, ParseErrorKind::UnexpectedEof))?;
            self.scanner.slice(start, end)
        };
        let start = self.scanner.position();
        self.check_chars(content, start)?;
        self.scanner.advance(content.len() + 2);

        if target == "xml" {
            if !content.trim_start().starts_with("version") {
                return Err(self.error_at(start, ParseErrorKind::Expected("version in XML declaration")));
            }
            return Ok(XmlEvent::XmlDeclaration {
                content: content.trim_end(),
            });
        }
        Ok(XmlEvent::ProcessingInstruction {
            target,
            content: normalize_newlines(content),
        })
    }

    fn read_comment(&mut self, offset: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(4);
        let start = self.scanner.position();
        let end = self
            .scanner
            .find("-->")
            .ok_or_else(|| self.error_at(offset, ParseErrorKind::UnexpectedEof))?;
        let content = self.scanner.slice(start, end);
        if let Some(i) = memmem::find(content.as_bytes(), b"--") {
            return Err(self.error_at(start + i, ParseErrorKind::DoubleHyphenInComment));
        }
        if content.ends_with('-') {
            return Err(self.error_at(end - 1, ParseErrorKind::DoubleHyphenInComment));
        }
        self.check_chars(content, start)?;
        self.scanner.advance(end + 3 - start);
        Ok(XmlEvent::Comment(normalize_newlines(content)))
    }

    fn read_cdata(&mut self, offset: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(9);
        let start = self.scanner.position();
        let end = self
            .scanner
            .find("]]>")
            .ok_or_else(|| self.error_at(offset, ParseErrorKind::UnexpectedEof))?;
        let content = self.scanner.slice(start, end);
        self.check_chars(content, start)?;
        self.scanner.advance(end + 3 - start);
        Ok(XmlEvent::CData(normalize_newlines(content)))
    }

    /// DOCTYPE is kept verbatim: quoted literals, the internal subset and
    /// comments inside it may contain `>`.
    fn read_doctype(&mut self, offset: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let start = self.scanner.position();
        self.scanner.advance("DOCTYPE".len());
        if !self.scanner.skip_whitespace() {
            return Err(self.scanner.error_here(ParseErrorKind::Expected("whitespace after DOCTYPE")));
        }

        let rest = self.scanner.remaining().as_bytes();
        let base = self.scanner.position();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut i = 0;
        let end = loop {
            let Some(&b) = rest.get(i) else {
                return Err(self.error_at(offset, ParseErrorKind::UnexpectedEof));
            };
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'<') if rest[i..].starts_with(b"<!--") => {
                    let close = memmem::find(&rest[i + 4..], b"-->")
                        .ok_or_else(|| self.error_at(base + i, ParseErrorKind::UnexpectedEof))?;
                    i += 4 + close + 2;
                }
                (None, b'>') if depth == 0 => break base + i,
                _ => {}
            }
            i += 1;
        };

        let body = self.scanner.slice(start, end);
        self.check_chars(body, start)?;
        self.scanner.advance(end + 1 - base);
        Ok(XmlEvent::DocType(body))
    }

    fn read_end_tag(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.scanner.error_here(self.scanner.eof_or(ParseErrorKind::Expected("element name"))))?;
        self.scanner.skip_whitespace();
        self.scanner.expect(">", "'>' to close end tag")?;
        Ok(XmlEvent::EndElement { name })
    }

    fn read_start_tag(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.scanner.error_here(self.scanner.eof_or(ParseErrorKind::Expected("element name"))))?;

        let mut attributes = Vec::new();
        let is_empty = loop {
            let had_whitespace = self.scanner.skip_whitespace();
            match self.scanner.peek() {
                Some(b'>') => {
                    self.scanner.advance(1);
                    break false;
                }
                Some(b'/') => {
                    self.scanner.expect("/>", "'/>'")?;
                    break true;
                }
                None => return Err(self.scanner.error_here(ParseErrorKind::UnexpectedEof)),
                Some(_) if !had_whitespace => {
                    return Err(self.scanner.error_here(ParseErrorKind::Expected("whitespace before attribute")))
                }
                Some(_) => attributes.push(read_attribute(&mut self.scanner)?),
            }
        };

        Ok(XmlEvent::StartElement(StartElement {
            name,
            attributes,
            is_empty,
        }))
    }

    fn check_chars(&self, raw: &str, start: usize) -> Result<(), ParseError> {
        match raw.char_indices().find(|&(_, c)| !is_xml_char(c)) {
            Some((i, c)) => Err(self.error_at(start + i, ParseErrorKind::InvalidChar(c as u32))),
            None => Ok(()),
        }
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<Positioned<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_event().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn events(input: &str) -> Vec<XmlEvent<'_>> {
        SliceReader::new(input)
            .map(|r| r.map(|p| p.event))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn error(input: &str) -> ParseError {
        SliceReader::new(input)
            .find_map(Result::err)
            .expect("input should fail to parse")
    }

    #[test]
    fn test_simple_element() {
        let events = events("<root>hi</root>");
        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name == "root" && !e.is_empty));
        assert_eq!(events[1], XmlEvent::Text(Cow::Borrowed("hi")));
        assert_eq!(events[2], XmlEvent::EndElement { name: "root" });
    }

    #[test]
    fn test_empty_element_with_attributes() {
        let events = events(r#"<a x="1" y='2'/>"#);
        let XmlEvent::StartElement(start) = &events[0] else {
            panic!("expected start element");
        };
        assert!(start.is_empty);
        let attrs: Vec<_> = start.attributes.iter().map(|a| (a.name, a.value.as_ref())).collect();
        assert_eq!(attrs, [("x", "1"), ("y", "2")]);
    }

    #[test]
    fn test_declaration_and_pi() {
        let events = events("<?xml version=\"1.0\"?><?style href='a'?><r/>");
        assert_eq!(events[0], XmlEvent::XmlDeclaration { content: "version=\"1.0\"" });
        assert!(matches!(&events[1], XmlEvent::ProcessingInstruction { target: "style", content } if content == "href='a'"));
    }

    #[test]
    fn test_comment_cdata_doctype() {
        let events = events("<!DOCTYPE r [<!ENTITY e \">\">]><r><!-- c --><![CDATA[<x>]]></r>");
        assert_eq!(events[0], XmlEvent::DocType("DOCTYPE r [<!ENTITY e \">\">]"));
        assert_eq!(events[2], XmlEvent::Comment(Cow::Borrowed(" c ")));
        assert_eq!(events[3], XmlEvent::CData(Cow::Borrowed("<x>")));
    }

    #[test]
    fn test_misplaced_declaration() {
        assert_eq!(error(" <?xml version=\"1.0\"?><r/>").kind, ParseErrorKind::MisplacedDeclaration);
        assert_eq!(error("<?XML x?><r/>").kind, ParseErrorKind::ReservedPiTarget("XML".into()));
    }

    #[test]
    fn test_comment_rules() {
        assert_eq!(error("<!-- a -- b -->").kind, ParseErrorKind::DoubleHyphenInComment);
        assert_eq!(error("<!-- a --->").kind, ParseErrorKind::DoubleHyphenInComment);
    }

    #[test]
    fn test_text_rules() {
        assert_eq!(error("<r>a ]]> b</r>").kind, ParseErrorKind::CDataEndInText);
        assert_eq!(error("<r>&bogus;</r>").kind, ParseErrorKind::UnknownEntity("bogus".into()));
    }

    #[test]
    fn test_invalid_element_names() {
        assert_eq!(error("<1a/>").kind, ParseErrorKind::Expected("element name"));
        assert_eq!(error("<a b='1'c='2'/>").kind, ParseErrorKind::Expected("whitespace before attribute"));
    }

    #[test]
    fn test_error_position() {
        let err = error("<r>\n  <!x>");
        assert_eq!(err.position.line, 2);
        assert_eq!(err.position.column, 3);
    }
}
