//! Incremental key/value parser
//!
//! Sibling of the markup scanner for attribute-less "flat object" text of
//! the `{"key": "value"}` shape. A strict pass runs first; when the input is
//! incomplete or malformed, a character scan recovers best-effort partial
//! values and reports which keys are known to be complete. The contract
//! mirrors the markup parser's: always return best current knowledge, flag
//! what is certain.

use crate::error::ParseError;
use crate::escape::{unescape, EscapeMode};
use indexmap::IndexMap;
use serde_json::Value;

/// Result of one key/value parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvParse {
    /// Keys whose values ended with an unambiguous terminator
    pub completed_keys: Vec<String>,
    /// Every value seen so far, in-progress ones included
    pub partial: IndexMap<String, String>,
}

impl KvParse {
    /// Whether `key`'s value is known to be complete
    #[must_use]
    pub fn is_complete(&self, key: &str) -> bool {
        self.completed_keys.iter().any(|k| k == key)
    }

    /// Best current value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.partial.get(key).map(String::as_str)
    }
}

/// Parse flat key/value text, tolerating truncation
///
/// A value is completed only when its terminator was unambiguous (closing
/// quote, `,`, `}`, or any delimiter for numbers); an in-progress value at
/// end of input is returned in `partial` but not in `completed_keys`.
///
/// # Errors
/// Reserved for attribute-style invariant violations; the current scan
/// always resolves malformed input into partial output.
pub fn parse(text: &str) -> Result<KvParse, ParseError> {
    if let Some(parsed) = strict_parse(text) {
        return Ok(parsed);
    }
    tracing::trace!(len = text.len(), "input is not a complete flat object; scanning");
    Ok(scan_partial(text))
}

/// Strict pass: the whole input is already a valid flat object
fn strict_parse(text: &str) -> Option<KvParse> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let Value::Object(map) = value else {
        return None;
    };

    let mut parsed = KvParse::default();
    for (key, value) in map {
        parsed.completed_keys.push(key.clone());
        parsed.partial.insert(key, scalar_text(&value));
    }
    Some(parsed)
}

/// `null` collapses to the empty string; scalars render as text
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KvState {
    /// Between pairs, waiting for a key's opening quote
    SeekKey,
    /// Inside a quoted key
    InKey,
    /// After a key, waiting for the value to start
    SeekValue,
    /// Inside a quoted string value
    InString,
    /// Inside a numeric value
    InNumber,
    /// Inside a bare literal (`null`, `true`, `false`)
    InBare,
}

/// Fallback scan over possibly-truncated input
fn scan_partial(text: &str) -> KvParse {
    let mut parsed = KvParse::default();
    let mut state = KvState::SeekKey;
    let mut key = String::new();
    let mut buf = String::new();
    let mut escaped = false;

    for c in text.chars() {
        match state {
            KvState::SeekKey => {
                if c == '"' {
                    buf.clear();
                    escaped = false;
                    state = KvState::InKey;
                }
            }
            KvState::InKey => {
                if c == '"' && !escaped {
                    key = unescape(&buf, EscapeMode::Lenient, 0).unwrap_or_default();
                    state = KvState::SeekValue;
                } else {
                    escaped = c == '\\' && !escaped;
                    buf.push(c);
                }
            }
            KvState::SeekValue => match c {
                ':' => {}
                '"' => {
                    buf.clear();
                    escaped = false;
                    state = KvState::InString;
                }
                '-' | '.' | '0'..='9' => {
                    buf.clear();
                    buf.push(c);
                    state = KvState::InNumber;
                }
                ',' | '}' => {
                    // Key with no value: complete it as empty
                    commit(&mut parsed, &mut key, String::new(), true);
                    state = KvState::SeekKey;
                }
                c if c.is_whitespace() => {}
                c => {
                    buf.clear();
                    buf.push(c);
                    state = KvState::InBare;
                }
            },
            KvState::InString => {
                if c == '"' && !escaped {
                    let value = unescape(&buf, EscapeMode::Lenient, 0).unwrap_or_default();
                    commit(&mut parsed, &mut key, value, true);
                    state = KvState::SeekKey;
                } else {
                    escaped = c == '\\' && !escaped;
                    buf.push(c);
                }
            }
            KvState::InNumber => {
                if c.is_ascii_digit() || c == '.' {
                    buf.push(c);
                } else {
                    // Any non-digit/non-dot delimiter completes a number
                    commit(&mut parsed, &mut key, std::mem::take(&mut buf), true);
                    state = KvState::SeekKey;
                    if c == '"' {
                        buf.clear();
                        escaped = false;
                        state = KvState::InKey;
                    }
                }
            }
            KvState::InBare => {
                if c.is_alphanumeric() {
                    buf.push(c);
                } else {
                    let value = bare_text(std::mem::take(&mut buf));
                    commit(&mut parsed, &mut key, value, true);
                    state = KvState::SeekKey;
                    if c == '"' {
                        buf.clear();
                        escaped = false;
                        state = KvState::InKey;
                    }
                }
            }
        }
    }

    // End of input: report in-progress values without completing them
    match state {
        KvState::InString => {
            let value = unescape(&buf, EscapeMode::Lenient, 0).unwrap_or_default();
            commit(&mut parsed, &mut key, value, false);
        }
        KvState::InNumber => {
            commit(&mut parsed, &mut key, std::mem::take(&mut buf), false);
        }
        KvState::InBare => {
            // "null" is immediately complete even without a terminator
            let complete = buf == "null";
            let value = bare_text(std::mem::take(&mut buf));
            commit(&mut parsed, &mut key, value, complete);
        }
        KvState::SeekValue => {
            commit(&mut parsed, &mut key, String::new(), false);
        }
        KvState::SeekKey | KvState::InKey => {}
    }

    parsed
}

/// `null` collapses to empty; other bare literals keep their text
fn bare_text(buf: String) -> String {
    if buf == "null" {
        String::new()
    } else {
        buf
    }
}

fn commit(parsed: &mut KvParse, key: &mut String, value: String, complete: bool) {
    if key.is_empty() {
        return;
    }
    let key = std::mem::take(key);
    if complete {
        parsed.completed_keys.push(key.clone());
    }
    parsed.partial.insert(key, value);
}
