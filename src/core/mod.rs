//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: strict reference decoding with Cow (zero-copy when possible)
//! - Attributes: attribute parsing inside start tags
//! - Encoding: UTF-16 detection and conversion to UTF-8
//! - Chars: XML 1.0 character and name classes

pub mod attributes;
pub mod chars;
pub mod encoding;
pub mod entities;
pub mod scanner;
