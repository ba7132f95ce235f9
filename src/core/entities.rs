//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Any other entity reference is an error: no DTD is processed, so nothing
//! else can be declared. Line endings are normalized to `\n` on the way, and
//! attribute values additionally get whitespace characters replaced by spaces.
//!
//! Uses Cow for zero-copy when the input needs no rewriting.

use memchr::{memchr, memchr2};
use std::borrow::Cow;

use super::chars::{is_ncname, is_xml_char};
use crate::error::ParseErrorKind;

/// Where the decoded characters come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Element content
    Text,
    /// Attribute value (whitespace normalized to spaces)
    Attribute,
}

/// Decode character data, returning the byte offset (within `raw`) of the
/// first problem on failure
pub fn decode(raw: &str, mode: DecodeMode) -> Result<Cow<'_, str>, (usize, ParseErrorKind)> {
    if let Some((i, c)) = raw.char_indices().find(|&(_, c)| !is_xml_char(c)) {
        return Err((i, ParseErrorKind::InvalidChar(c as u32)));
    }

    let bytes = raw.as_bytes();
    let first = match mode {
        DecodeMode::Text => memchr2(b'&', b'\r', bytes),
        DecodeMode::Attribute => bytes.iter().position(|b| matches!(b, b'&' | b'\r' | b'\n' | b'\t')),
    };
    let Some(first) = first else {
        return Ok(Cow::Borrowed(raw));
    };

    let newline = match mode {
        DecodeMode::Text => '\n',
        DecodeMode::Attribute => ' ',
    };
    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut pos = first;

    while pos < bytes.len() {
        match bytes[pos] {
            b'&' => {
                let semi = memchr(b';', &bytes[pos..])
                    .map(|i| pos + i)
                    .ok_or((pos, ParseErrorKind::MalformedReference))?;
                let c = decode_reference(&raw[pos + 1..semi]).map_err(|kind| (pos, kind))?;
                out.push(c);
                pos = semi + 1;
            }
            b'\r' => {
                out.push(newline);
                pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
            }
            b'\n' | b'\t' if mode == DecodeMode::Attribute => {
                out.push(' ');
                pos += 1;
            }
            _ => {
                let next = match mode {
                    DecodeMode::Text => memchr2(b'&', b'\r', &bytes[pos..]),
                    DecodeMode::Attribute => bytes[pos..]
                        .iter()
                        .position(|b| matches!(b, b'&' | b'\r' | b'\n' | b'\t')),
                }
                .map(|i| pos + i)
                .unwrap_or(bytes.len());
                out.push_str(&raw[pos..next]);
                pos = next;
            }
        }
    }

    Ok(Cow::Owned(out))
}

/// Normalize line endings only (comments, CDATA, processing instructions)
pub fn normalize_newlines(raw: &str) -> Cow<'_, str> {
    if memchr(b'\r', raw.as_bytes()).is_none() {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Decode the text between `&` and `;`
pub fn decode_reference(name: &str) -> Result<char, ParseErrorKind> {
    let code = if let Some(hex) = name.strip_prefix("#x") {
        parse_code(hex, 16)?
    } else if let Some(dec) = name.strip_prefix('#') {
        parse_code(dec, 10)?
    } else {
        return match name {
            "lt" => Ok('<'),
            "gt" => Ok('>'),
            "amp" => Ok('&'),
            "quot" => Ok('"'),
            "apos" => Ok('\''),
            _ if is_ncname(name) => Err(ParseErrorKind::UnknownEntity(name.to_string())),
            _ => Err(ParseErrorKind::MalformedReference),
        };
    };

    match char::from_u32(code) {
        Some(c) if is_xml_char(c) => Ok(c),
        _ => Err(ParseErrorKind::InvalidChar(code)),
    }
}

fn parse_code(digits: &str, radix: u32) -> Result<u32, ParseErrorKind> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ParseErrorKind::MalformedReference);
    }
    u32::from_str_radix(digits, radix).map_err(|_| ParseErrorKind::MalformedReference)
}
