//! Quill Chunk - greedy token-budget document chunking
//!
//! Partitions a long document, given as an ordered sequence of
//! position-addressable blocks, into boundary-aligned edit spans sized to a
//! token budget:
//! - Pass 1 groups blocks into maximal runs between paragraph breaks
//! - Pass 2 greedily merges consecutive runs while the combined estimated
//!   cost fits the budget
//!
//! The budget is a merge ceiling: a single run that alone exceeds it is
//! still emitted whole, so every piece of content lands in exactly one span.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod chunk;
pub mod tokens;

// Re-exports for convenience
pub use chunk::{chunk, Block, EditTarget};
pub use tokens::estimate_tokens;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
