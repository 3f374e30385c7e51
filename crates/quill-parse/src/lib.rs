//! Quill Parse - incremental parsers for streaming model output
//!
//! Decodes structurally meaningful fragments out of byte streams that are,
//! at any instant, syntactically incomplete:
//! - A markup scanner recovering a tree of tagged fragments from partial
//!   input, each flagged complete or incomplete
//! - A sibling key/value parser for flat `{"key": "value"}` text
//! - A stream buffer tying "bytes arrived" to "re-parse the whole buffer"
//!
//! Both parsers are stateless and safe to re-run on a growing buffer:
//! previously incomplete fragments become complete once their closing
//! boundary streams in, and a wrong parse is never produced along the way.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_parse::StreamBuffer;
//!
//! let mut buf = StreamBuffer::new();
//! buf.push_chunk(b"<response><section>dra");
//!
//! let doc = buf.parse_markup()?;
//! let section = doc.find_deep("section").unwrap();
//! assert!(!section.complete); // more bytes still to come
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
mod escape;
pub mod kv;
pub mod scan;
pub mod stream;
pub mod tag;

// Re-exports for convenience
pub use error::ParseError;
pub use kv::{parse as parse_kv, KvParse};
pub use scan::parse;
pub use stream::StreamBuffer;
pub use tag::{Span, Tag, XmlDocument};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
