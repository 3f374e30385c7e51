//! Textual escape handling
//!
//! Both parsers accept model output containing the common textual escapes
//! (`\n \t \r \b \f \v`) plus `\uXXXX`, including UTF-16 surrogate-pair
//! reconstruction. Attribute values are decoded strictly (a malformed
//! `\uXXXX` is a hard error); free text is decoded leniently, leaving
//! anything unrecognized in place so a growing buffer never errors mid-way.

use crate::error::ParseError;

/// How strictly to treat malformed `\uXXXX` sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeMode {
    /// Malformed sequences are errors (attribute values)
    Strict,
    /// Malformed sequences pass through or degrade to U+FFFD (text)
    Lenient,
}

/// Decode backslash escapes in `input`
///
/// `base` is the byte offset of `input` within the full parse buffer, used
/// only for error positions.
pub(crate) fn unescape(input: &str, mode: EscapeMode, base: usize) -> Result<String, ParseError> {
    if !input.contains('\\') {
        return Ok(input.to_string());
    }

    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut pos = base;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            pos += c.len_utf8();
            i += 1;
            continue;
        }

        let Some(&esc) = chars.get(i + 1) else {
            // Trailing backslash: more bytes may still arrive
            out.push('\\');
            break;
        };

        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            'u' => {
                let consumed = decode_unicode(&chars, i, pos, mode, &mut out)?;
                pos += byte_len(&chars[i..i + consumed]);
                i += consumed;
                continue;
            }
            other => {
                // Unrecognized escape: keep the escaped character
                out.push(other);
            }
        }
        pos += byte_len(&chars[i..i + 2]);
        i += 2;
    }

    Ok(out)
}

/// Decode one `\uXXXX` (possibly a surrogate pair) starting at `chars[start]`
///
/// Returns the number of chars consumed, `\` and `u` included.
fn decode_unicode(
    chars: &[char],
    start: usize,
    pos: usize,
    mode: EscapeMode,
    out: &mut String,
) -> Result<usize, ParseError> {
    let Some(first) = hex4(chars, start + 2) else {
        return match mode {
            EscapeMode::Strict => Err(ParseError::InvalidEscape {
                position: pos,
                message: "\\u requires four hex digits".into(),
            }),
            EscapeMode::Lenient => {
                // Truncated or malformed: keep the prefix literal
                out.push('\\');
                out.push('u');
                Ok(2)
            }
        };
    };

    // Plain scalar
    if !(0xD800..=0xDFFF).contains(&first) {
        out.push(char::from_u32(first).unwrap_or('\u{FFFD}'));
        return Ok(6);
    }

    // Low surrogate with no preceding high surrogate
    if first >= 0xDC00 {
        return match mode {
            EscapeMode::Strict => Err(ParseError::InvalidEscape {
                position: pos,
                message: format!("unpaired low surrogate \\u{first:04X}"),
            }),
            EscapeMode::Lenient => {
                out.push('\u{FFFD}');
                Ok(6)
            }
        };
    }

    // High surrogate: look for an immediately following \uXXXX low surrogate
    let has_second_escape = chars.get(start + 6) == Some(&'\\') && chars.get(start + 7) == Some(&'u');
    let second = if has_second_escape {
        hex4(chars, start + 8)
    } else {
        None
    };

    match second {
        Some(low) if (0xDC00..=0xDFFF).contains(&low) => {
            let combined = 0x10000 + ((first - 0xD800) << 10) + (low - 0xDC00);
            out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
            Ok(12)
        }
        _ => match mode {
            EscapeMode::Strict => Err(ParseError::InvalidEscape {
                position: pos,
                message: format!("unpaired high surrogate \\u{first:04X}"),
            }),
            EscapeMode::Lenient => {
                out.push('\u{FFFD}');
                Ok(6)
            }
        },
    }
}

/// Read four hex digits at `chars[at..at+4]`
fn hex4(chars: &[char], at: usize) -> Option<u32> {
    if chars.len() < at + 4 {
        return None;
    }
    let mut value = 0;
    for &c in &chars[at..at + 4] {
        value = value * 16 + c.to_digit(16)?;
    }
    Some(value)
}

fn byte_len(chars: &[char]) -> usize {
    chars.iter().map(|c| c.len_utf8()).sum()
}
