//! Error types for the incremental parsers
//!
//! Malformed or truncated input is not an error here: both parsers resolve
//! ambiguity into best-effort partial output with explicit completeness
//! flags. The only hard errors are attribute-value invariant violations.

/// Parse failure
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A `\uXXXX` escape with non-hex digits or an unpaired surrogate
    #[error("invalid escape at byte {position}: {message}")]
    InvalidEscape {
        /// Byte offset of the backslash
        position: usize,
        /// What was wrong with the sequence
        message: String,
    },
}
