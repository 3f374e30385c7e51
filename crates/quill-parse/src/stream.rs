//! Append-only stream buffer
//!
//! The piece every streaming callback needs between "bytes arrived" and
//! "re-parse the whole buffer": chunks append as they stream in, and the
//! full accumulated text is re-parsed on demand. Re-parsing the whole
//! buffer each time keeps the parsers stateless and the view always
//! consistent with the latest bytes.

use crate::error::ParseError;
use crate::kv::KvParse;
use crate::tag::XmlDocument;
use std::borrow::Cow;

/// Accumulates streamed bytes for repeated re-parsing
#[derive(Debug, Clone, Default)]
pub struct StreamBuffer {
    bytes: Vec<u8>,
}

impl StreamBuffer {
    /// Create an empty buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one streamed chunk
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Total bytes accumulated
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has arrived yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The accumulated text, lossy at a chunk-split UTF-8 boundary
    ///
    /// A multi-byte character split across chunks decodes once its tail
    /// arrives; until then its prefix shows as U+FFFD, consistent with the
    /// best-effort contract of the parsers that consume this view.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Re-parse the whole buffer as markup
    ///
    /// # Errors
    /// Propagates `ParseError` from the markup scanner.
    pub fn parse_markup(&self) -> Result<XmlDocument, ParseError> {
        crate::scan::parse(&self.text())
    }

    /// Re-parse the whole buffer as flat key/value text
    ///
    /// # Errors
    /// Propagates `ParseError` from the key/value parser.
    pub fn parse_kv(&self) -> Result<KvParse, ParseError> {
        crate::kv::parse(&self.text())
    }
}
