//! XML Encoding Detection and Conversion
//!
//! Detects UTF-16 input by byte order mark or by the `<` pattern of an
//! unmarked document, and converts it to UTF-8 before parsing. A UTF-8 BOM is
//! stripped. Every other input is passed through unchanged and validated as
//! UTF-8 by the caller.

use std::borrow::Cow;

use crate::error::ParseErrorKind;

/// Encoding of XML input, decided from its first bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] => XmlEncoding::Utf16Be,
            [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }
}

/// Convert input to UTF-8 bytes, borrowing when no conversion is needed
pub fn to_utf8(input: &[u8]) -> Result<Cow<'_, [u8]>, ParseErrorKind> {
    match XmlEncoding::detect(input) {
        XmlEncoding::Utf8 => Ok(Cow::Borrowed(
            input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input),
        )),
        XmlEncoding::Utf16Le => {
            let bytes = input.strip_prefix(&[0xFF, 0xFE]).unwrap_or(input);
            decode_utf16(bytes, u16::from_le_bytes).map(Cow::Owned)
        }
        XmlEncoding::Utf16Be => {
            let bytes = input.strip_prefix(&[0xFE, 0xFF]).unwrap_or(input);
            decode_utf16(bytes, u16::from_be_bytes).map(Cow::Owned)
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<Vec<u8>, ParseErrorKind> {
    if bytes.len() % 2 != 0 {
        return Err(ParseErrorKind::InvalidUtf16);
    }
    let code_units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(code_units)
        .collect::<Result<String, _>>()
        .map(String::into_bytes)
        .map_err(|_| ParseErrorKind::InvalidUtf16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<root/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), XmlEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf16() {
        assert_eq!(XmlEncoding::detect(&[0xFF, 0xFE, b'<', 0]), XmlEncoding::Utf16Le);
        assert_eq!(XmlEncoding::detect(&[0xFE, 0xFF, 0, b'<']), XmlEncoding::Utf16Be);
        assert_eq!(XmlEncoding::detect(&[b'<', 0, b'a', 0]), XmlEncoding::Utf16Le);
    }

    #[test]
    fn test_strip_utf8_bom() {
        let converted = to_utf8(&[0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>']).unwrap();
        assert_eq!(&*converted, b"<a/>");
        assert!(matches!(converted, Cow::Borrowed(_)));
    }

    #[test]
    fn test_convert_utf16_le() {
        let input: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("<a>é</a>".encode_utf16().flat_map(u16::to_le_bytes))
            .collect();
        assert_eq!(&*to_utf8(&input).unwrap(), "<a>é</a>".as_bytes());
    }

    #[test]
    fn test_convert_utf16_be() {
        let input: Vec<u8> = "<a/>".encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(&*to_utf8(&input).unwrap(), b"<a/>");
    }

    #[test]
    fn test_odd_length_utf16() {
        assert_eq!(to_utf8(&[0xFF, 0xFE, b'<']), Err(ParseErrorKind::InvalidUtf16));
    }
}
