//! String Interning Pool
//!
//! Deduplicated storage for names, namespace URIs and character data. All
//! strings live in one buffer; an id is an index into `entries`.
//!
//! Uses hash-based lookup to avoid storing duplicate string data.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Id of the empty string
pub const EMPTY: u32 = 0;

/// String interning pool
///
/// Memory layout:
/// - `entries`: (offset, len) in `data` for each interned string ID
/// - `data`: buffer holding every string back to back
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
#[derive(Debug)]
pub struct StringPool {
    entries: Vec<(u32, u32)>,
    data: String,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new pool; id 0 is the empty string
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(256);
        entries.push((0, 0));
        StringPool {
            entries,
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an equal string if one exists
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return EMPTY;
        }
        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            if let Some(&id) = ids.iter().find(|&&id| self.get(id) == s) {
                return id;
            }
        }

        let id = self.entries.len() as u32;
        self.entries.push((self.data.len() as u32, s.len() as u32));
        self.data.push_str(s);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Resolve an id; unknown ids resolve to the empty string
    #[inline]
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => &self.data[offset as usize..(offset + len) as usize],
            None => "",
        }
    }

    /// Number of distinct strings, the empty string included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut pool = StringPool::new();
        let a = pool.intern("item");
        let b = pool.intern("other");
        assert_ne!(a, b);
        assert_eq!(pool.intern("item"), a);
        assert_eq!(pool.get(a), "item");
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), EMPTY);
        assert_eq!(pool.get(EMPTY), "");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_long_strings() {
        let mut pool = StringPool::new();
        let long = "x".repeat(100_000);
        let id = pool.intern(&long);
        assert_eq!(pool.get(id).len(), 100_000);
    }
}
