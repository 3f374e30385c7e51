//! Parsed tag tree
//!
//! The markup parser's output: an ordered forest of [`Tag`]s, each carrying
//! its name, normalized text value, exact raw span, attributes, completeness
//! flag, and children. The query surface (`find`, `find_all`, `find_deep`,
//! `find_all_deep`) is the vocabulary consuming steps use to pull structured
//! values out of a parse.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Byte range `[start, end)` into the parsed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Span {
    /// A span covering `[start, end)`
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span anchored at `at`
    #[inline]
    #[must_use]
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Span length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One parsed markup fragment
///
/// `raw` is always the exact input substring between the end of the open tag
/// and its matching close (or the end of the buffer if unclosed); `value` is
/// the same text with escapes applied and NFC normalization. Children never
/// outlive their parent's span.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, NFC-normalized
    pub key: String,
    /// Normalized text value (escapes applied, NFC)
    pub value: String,
    /// Exact un-normalized text between open and close
    pub raw: String,
    /// Byte range of `raw` within the parsed buffer
    pub span: Span,
    /// Attributes in source order
    pub attributes: IndexMap<String, String>,
    /// Whether the closing boundary has been observed yet
    pub complete: bool,
    /// Child tags in document order
    pub children: Vec<Tag>,
}

impl Tag {
    /// Attribute value by name
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child named `key`
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.children.iter().find(|t| t.key == key)
    }

    /// All direct children named `key`
    #[must_use]
    pub fn find_all(&self, key: &str) -> Vec<&Tag> {
        self.children.iter().filter(|t| t.key == key).collect()
    }

    /// First descendant named `key`, depth-first
    #[must_use]
    pub fn find_deep(&self, key: &str) -> Option<&Tag> {
        for child in &self.children {
            if child.key == key {
                return Some(child);
            }
            if let Some(found) = child.find_deep(key) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants named `key`, depth-first order
    #[must_use]
    pub fn find_all_deep(&self, key: &str) -> Vec<&Tag> {
        let mut found = Vec::new();
        self.collect_deep(key, &mut found);
        found
    }

    fn collect_deep<'a>(&'a self, key: &str, found: &mut Vec<&'a Tag>) {
        for child in &self.children {
            if child.key == key {
                found.push(child);
            }
            child.collect_deep(key, found);
        }
    }
}

/// An ordered forest of top-level tags
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XmlDocument {
    roots: Vec<Tag>,
}

impl XmlDocument {
    pub(crate) fn new(roots: Vec<Tag>) -> Self {
        Self { roots }
    }

    /// Top-level tags in document order
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[Tag] {
        &self.roots
    }

    /// First top-level tag named `key`
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.roots.iter().find(|t| t.key == key)
    }

    /// All top-level tags named `key`
    #[must_use]
    pub fn find_all(&self, key: &str) -> Vec<&Tag> {
        self.roots.iter().filter(|t| t.key == key).collect()
    }

    /// First tag named `key` at any depth, depth-first
    #[must_use]
    pub fn find_deep(&self, key: &str) -> Option<&Tag> {
        for root in &self.roots {
            if root.key == key {
                return Some(root);
            }
            if let Some(found) = root.find_deep(key) {
                return Some(found);
            }
        }
        None
    }

    /// All tags named `key` at any depth, depth-first order
    #[must_use]
    pub fn find_all_deep(&self, key: &str) -> Vec<&Tag> {
        let mut found = Vec::new();
        for root in &self.roots {
            if root.key == key {
                found.push(root);
            }
            root.collect_deep(key, &mut found);
        }
        found
    }
}
