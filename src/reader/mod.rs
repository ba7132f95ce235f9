//! XML Reader Module
//!
//! - SliceReader: strict zero-copy pull parser over a UTF-8 string
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;

pub use events::{Positioned, StartElement, XmlEvent};
pub use slice::SliceReader;

pub use crate::core::attributes::Attribute;
