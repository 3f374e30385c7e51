//! Incremental markup scanner
//!
//! A single left-to-right scan over Unicode code points that recovers a tag
//! forest from input that is, at any instant, syntactically incomplete. The
//! same `parse` call is re-run over the whole buffer as more text arrives:
//! tags whose close has not been observed yet come back flagged incomplete,
//! and flip to complete once their closing tag streams in.
//!
//! Malformed input is never an error; the scanner always returns its best
//! current view. The one exception is an attribute value with an invalid
//! `\uXXXX` escape, which violates an attribute invariant and fails the
//! parse.

use crate::error::ParseError;
use crate::escape::{unescape, EscapeMode};
use crate::tag::{Span, Tag, XmlDocument};
use indexmap::IndexMap;
use std::iter::Peekable;
use std::str::CharIndices;
use unicode_normalization::UnicodeNormalization;

/// Parse `text` into the best current view of its tag forest
///
/// # Errors
/// - `ParseError::InvalidEscape` for a malformed `\uXXXX` inside an
///   attribute value
pub fn parse(text: &str) -> Result<XmlDocument, ParseError> {
    Scanner::new(text).run()
}

/// Scanner state, one variant per syntactic position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain text between tags
    Text,
    /// Inside `<name`
    OpenTagName,
    /// Inside an open tag, before an attribute name
    AttrSeek,
    /// Inside an attribute name
    AttrName,
    /// After an attribute name, waiting for `=`
    AttrEqual,
    /// After `=`, waiting for the value to start
    AttrValueSeek,
    /// Inside a quoted attribute value, with its terminating quote
    AttrValueQuoted(char),
    /// Inside an unquoted attribute value
    AttrValueUnquoted,
    /// Inside `</name`
    CloseTagName,
}

/// An open tag still waiting for its close
#[derive(Debug)]
struct OpenTag {
    key: String,
    attributes: IndexMap<String, String>,
    /// Byte offset just past the open tag's `>`
    content_start: usize,
    /// Raw-span end snapshotted when a `</` was seen but not yet resolved
    raw_end_hint: Option<usize>,
    children: Vec<Tag>,
}

struct Scanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    state: State,
    stack: Vec<OpenTag>,
    roots: Vec<Tag>,
    // open tag under construction
    pending_name: String,
    pending_attrs: IndexMap<String, String>,
    attr_name: String,
    attr_value: String,
    attr_value_start: usize,
    attr_escaped: bool,
    // close tag under construction
    close_name: String,
    close_lt: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            state: State::Text,
            stack: Vec::new(),
            roots: Vec::new(),
            pending_name: String::new(),
            pending_attrs: IndexMap::new(),
            attr_name: String::new(),
            attr_value: String::new(),
            attr_value_start: 0,
            attr_escaped: false,
            close_name: String::new(),
            close_lt: 0,
        }
    }

    fn run(mut self) -> Result<XmlDocument, ParseError> {
        while let Some((pos, c)) = self.chars.next() {
            match self.state {
                State::Text => {
                    if c == '<' {
                        self.on_lt(pos);
                    }
                }
                State::OpenTagName => match c {
                    '>' => self.push_open(pos + 1),
                    '<' => {
                        // Abandoned open tag; restart at this bracket
                        self.pending_name.clear();
                        self.pending_attrs.clear();
                        self.on_lt(pos);
                    }
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => {
                        if self.pending_name.is_empty() {
                            // "< " is text, not a tag
                            self.state = State::Text;
                        } else {
                            self.state = State::AttrSeek;
                        }
                    }
                    c => self.pending_name.push(c),
                },
                State::AttrSeek => match c {
                    '>' => self.push_open(pos + 1),
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        self.attr_name.clear();
                        self.attr_name.push(c);
                        self.state = State::AttrName;
                    }
                },
                State::AttrName => match c {
                    '=' => {
                        self.attr_value.clear();
                        self.state = State::AttrValueSeek;
                    }
                    '>' => {
                        self.commit_bare_attr();
                        self.push_open(pos + 1);
                    }
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        self.commit_bare_attr();
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => self.state = State::AttrEqual,
                    c => self.attr_name.push(c),
                },
                State::AttrEqual => match c {
                    '=' => {
                        self.attr_value.clear();
                        self.state = State::AttrValueSeek;
                    }
                    '>' => {
                        self.commit_bare_attr();
                        self.push_open(pos + 1);
                    }
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        self.commit_bare_attr();
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        // Previous attribute had no value; a new one starts
                        self.commit_bare_attr();
                        self.attr_name.push(c);
                        self.state = State::AttrName;
                    }
                },
                State::AttrValueSeek => match c {
                    '"' | '\'' => {
                        self.attr_value_start = pos + 1;
                        self.attr_escaped = false;
                        self.state = State::AttrValueQuoted(c);
                    }
                    '>' => {
                        self.commit_bare_attr();
                        self.push_open(pos + 1);
                    }
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        self.commit_bare_attr();
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        self.attr_value_start = pos;
                        self.attr_value.push(c);
                        self.state = State::AttrValueUnquoted;
                    }
                },
                State::AttrValueQuoted(quote) => {
                    if c == quote && !self.attr_escaped {
                        let value = std::mem::take(&mut self.attr_value);
                        let base = self.attr_value_start;
                        self.commit_strict_attr(value, base)?;
                        self.state = State::AttrSeek;
                    } else {
                        self.attr_escaped = c == '\\' && !self.attr_escaped;
                        self.attr_value.push(c);
                    }
                }
                State::AttrValueUnquoted => match c {
                    '>' => {
                        let value = std::mem::take(&mut self.attr_value);
                        let base = self.attr_value_start;
                        self.commit_strict_attr(value, base)?;
                        self.push_open(pos + 1);
                    }
                    '/' if self.peek_is('>') => {
                        self.chars.next();
                        let value = std::mem::take(&mut self.attr_value);
                        let base = self.attr_value_start;
                        self.commit_strict_attr(value, base)?;
                        self.emit_self_closing(pos + 2);
                    }
                    c if c.is_whitespace() => {
                        let value = std::mem::take(&mut self.attr_value);
                        let base = self.attr_value_start;
                        self.commit_strict_attr(value, base)?;
                        self.state = State::AttrSeek;
                    }
                    c => self.attr_value.push(c),
                },
                State::CloseTagName => match c {
                    '>' => {
                        let name = std::mem::take(&mut self.close_name);
                        self.resolve_close(&name, self.close_lt);
                        self.state = State::Text;
                    }
                    c if c.is_whitespace() => {}
                    c => self.close_name.push(c),
                },
            }
        }

        self.finish()
    }

    fn peek_is(&mut self, expected: char) -> bool {
        matches!(self.chars.peek(), Some(&(_, c)) if c == expected)
    }

    /// Dispatch a `<` seen in text position
    fn on_lt(&mut self, pos: usize) {
        match self.chars.peek() {
            Some(&(_, '/')) => {
                self.chars.next();
                self.close_name.clear();
                self.close_lt = pos;
                // Snapshot the enclosing open tag's raw span immediately
                if let Some(top) = self.stack.last_mut() {
                    top.raw_end_hint = Some(pos);
                }
                self.state = State::CloseTagName;
            }
            Some(&(_, c)) if !c.is_whitespace() && c != '<' => {
                self.pending_name.clear();
                self.pending_attrs.clear();
                self.state = State::OpenTagName;
            }
            _ => {
                // A bare bracket is text
                self.state = State::Text;
            }
        }
    }

    /// Finish the open tag's `<name attrs>` and push it on the stack
    fn push_open(&mut self, content_start: usize) {
        self.stack.push(OpenTag {
            key: std::mem::take(&mut self.pending_name),
            attributes: std::mem::take(&mut self.pending_attrs),
            content_start,
            raw_end_hint: None,
            children: Vec::new(),
        });
        self.state = State::Text;
    }

    /// Emit a `<name ... />` as a complete tag with an empty span
    fn emit_self_closing(&mut self, after_gt: usize) {
        let tag = Tag {
            key: nfc(&std::mem::take(&mut self.pending_name)),
            value: String::new(),
            raw: String::new(),
            span: Span::empty(after_gt),
            attributes: std::mem::take(&mut self.pending_attrs),
            complete: true,
            children: Vec::new(),
        };
        self.attach(tag);
        self.state = State::Text;
    }

    /// Commit an attribute that never had a value
    fn commit_bare_attr(&mut self) {
        let name = nfc(&std::mem::take(&mut self.attr_name));
        self.pending_attrs.insert(name, String::new());
    }

    /// Commit an attribute value with strict escape decoding
    fn commit_strict_attr(&mut self, raw: String, base: usize) -> Result<(), ParseError> {
        let decoded = unescape(&raw, EscapeMode::Strict, base)?;
        let name = nfc(&std::mem::take(&mut self.attr_name));
        self.pending_attrs.insert(name, nfc(&decoded));
        Ok(())
    }

    /// Attach a finished tag to the innermost open tag, or the root forest
    fn attach(&mut self, tag: Tag) {
        match self.stack.last_mut() {
            Some(top) => top.children.push(tag),
            None => self.roots.push(tag),
        }
    }

    /// Resolve `</name>`: close the nearest enclosing open tag of that name
    ///
    /// Open tags between the top of the stack and the matched tag never got
    /// their own close; they are reassigned as completed children of the tag
    /// that does close, with their own text cleared (ownership of that text
    /// moves to the closing tag).
    fn resolve_close(&mut self, name: &str, lt_pos: usize) {
        let Some(idx) = self.stack.iter().rposition(|t| t.key == name) else {
            // Stray close: drop it and undo the span snapshot
            if let Some(top) = self.stack.last_mut() {
                top.raw_end_hint = None;
            }
            return;
        };

        let mut orphans: Vec<Tag> = Vec::new();
        while self.stack.len() > idx + 1 {
            let orphan = self.stack.pop().expect("stack length checked");
            orphans.push(Tag {
                key: nfc(&orphan.key),
                value: String::new(),
                raw: String::new(),
                span: Span::empty(orphan.content_start),
                attributes: orphan.attributes,
                complete: true,
                children: orphan.children,
            });
        }
        // Document order: outermost orphan first
        orphans.reverse();

        let open = self.stack.pop().expect("matched index exists");
        let raw_end = lt_pos.max(open.content_start);
        let raw = &self.input[open.content_start..raw_end];
        let mut children = open.children;
        children.extend(orphans);

        let tag = Tag {
            key: nfc(&open.key),
            value: text_value(raw),
            raw: raw.to_string(),
            span: Span::new(open.content_start, raw_end),
            attributes: open.attributes,
            complete: true,
            children,
        };
        self.attach(tag);
    }

    /// Finalize at end of input: whatever is still open is incomplete
    fn finish(mut self) -> Result<XmlDocument, ParseError> {
        // An open tag whose `>` never arrived
        if !self.pending_name.is_empty() {
            if !self.attr_name.is_empty() {
                let value = unescape(&self.attr_value, EscapeMode::Lenient, 0)
                    .unwrap_or_default();
                let name = nfc(&std::mem::take(&mut self.attr_name));
                self.pending_attrs.insert(name, nfc(&value));
            }
            let tag = Tag {
                key: nfc(&std::mem::take(&mut self.pending_name)),
                value: String::new(),
                raw: String::new(),
                span: Span::empty(self.input.len()),
                attributes: std::mem::take(&mut self.pending_attrs),
                complete: false,
                children: Vec::new(),
            };
            self.attach(tag);
        }

        // Unwind still-open tags, innermost first
        while let Some(open) = self.stack.pop() {
            let raw_end = open
                .raw_end_hint
                .unwrap_or(self.input.len())
                .max(open.content_start);
            let raw = &self.input[open.content_start..raw_end];
            let tag = Tag {
                key: nfc(&open.key),
                value: text_value(raw),
                raw: raw.to_string(),
                span: Span::new(open.content_start, raw_end),
                attributes: open.attributes,
                complete: false,
                children: open.children,
            };
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(tag),
                None => self.roots.push(tag),
            }
        }

        Ok(XmlDocument::new(self.roots))
    }
}

/// Normalized text value: lenient escape decoding, then NFC
fn text_value(raw: &str) -> String {
    let decoded = unescape(raw, EscapeMode::Lenient, 0).unwrap_or_else(|_| raw.to_string());
    nfc(&decoded)
}

fn nfc(s: &str) -> String {
    s.nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_complete_document() {
        let doc = parse("<response><ok/></response>").unwrap();

        assert_eq!(doc.roots().len(), 1);
        let response = doc.find("response").unwrap();
        assert!(response.complete);
        assert_eq!(response.raw, "<ok/>");

        let ok = response.find("ok").unwrap();
        assert!(ok.complete);
        assert!(ok.span.is_empty());
    }

    #[test]
    fn text_value_and_span() {
        let input = "<title>Moby Dick</title>";
        let doc = parse(input).unwrap();
        let title = doc.find("title").unwrap();

        assert_eq!(title.value, "Moby Dick");
        assert_eq!(title.raw, "Moby Dick");
        assert_eq!(&input[title.span.start..title.span.end], "Moby Dick");
    }

    #[test]
    fn attributes_quoted_and_unquoted() {
        let doc = parse(r#"<section id="intro" rank=3 draft>x</section>"#).unwrap();
        let section = doc.find("section").unwrap();

        assert_eq!(section.attr("id"), Some("intro"));
        assert_eq!(section.attr("rank"), Some("3"));
        assert_eq!(section.attr("draft"), Some(""));
        assert_eq!(section.value, "x");
    }

    #[test]
    fn single_quoted_attribute() {
        let doc = parse("<a href='x y'>t</a>").unwrap();
        assert_eq!(doc.find("a").unwrap().attr("href"), Some("x y"));
    }

    #[test]
    fn attribute_escapes_are_strict() {
        let doc = parse(r#"<a title="line\nbreak">x</a>"#).unwrap();
        assert_eq!(doc.find("a").unwrap().attr("title"), Some("line\nbreak"));

        assert!(parse(r#"<a title="\uQQQQ">x</a>"#).is_err());
    }

    #[test]
    fn unclosed_tag_is_incomplete() {
        let doc = parse("<response>partial tex").unwrap();
        let response = doc.find("response").unwrap();

        assert!(!response.complete);
        assert_eq!(response.value, "partial tex");
    }

    #[test]
    fn incomplete_becomes_complete_on_reparse() {
        let partial = parse("<response>body").unwrap();
        assert!(!partial.find("response").unwrap().complete);

        let full = parse("<response>body</response>").unwrap();
        let response = full.find("response").unwrap();
        assert!(response.complete);
        assert_eq!(response.value, "body");
    }

    #[test]
    fn nested_incomplete_tags_stay_nested() {
        let doc = parse("<a><b>inner").unwrap();
        let a = doc.find("a").unwrap();

        assert!(!a.complete);
        let b = a.find("b").unwrap();
        assert!(!b.complete);
        assert_eq!(b.value, "inner");
    }

    #[test]
    fn orphan_recovery_on_outer_close() {
        let doc = parse("<a><b>x</b><c>y</a>").unwrap();
        let a = doc.find("a").unwrap();

        assert!(a.complete);
        assert_eq!(a.raw, "<b>x</b><c>y");

        let b = a.find("b").unwrap();
        assert!(b.complete);
        assert_eq!(b.value, "x");

        // c never closed; it is absorbed as a completed child, text cleared
        let c = a.find("c").unwrap();
        assert!(c.complete);
        assert_eq!(c.value, "");
    }

    #[test]
    fn deeply_nested_orphans_flatten_in_document_order() {
        let doc = parse("<a><b><c>text</a>").unwrap();
        let a = doc.find("a").unwrap();

        assert!(a.complete);
        let keys: Vec<_> = a.children.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert!(a.children.iter().all(|t| t.complete));
    }

    #[test]
    fn close_snapshot_excludes_pending_close_text() {
        // The `</resp` suffix has not resolved yet; the raw span was
        // snapshotted at the bracket.
        let doc = parse("<response>body</resp").unwrap();
        let response = doc.find("response").unwrap();

        assert!(!response.complete);
        assert_eq!(response.raw, "body");
    }

    #[test]
    fn partial_open_tag_at_eof() {
        let doc = parse("<response><sec").unwrap();
        let response = doc.find("response").unwrap();

        assert!(!response.complete);
        let sec = response.find("sec").unwrap();
        assert!(!sec.complete);
        assert!(sec.span.is_empty());
    }

    #[test]
    fn lone_bracket_is_text() {
        let doc = parse("3 < 5 and <tag>v</tag>").unwrap();
        assert_eq!(doc.roots().len(), 1);
        assert_eq!(doc.find("tag").unwrap().value, "v");
    }

    #[test]
    fn stray_close_is_ignored() {
        let doc = parse("</nothing><a>x</a>").unwrap();
        assert_eq!(doc.roots().len(), 1);
        assert_eq!(doc.find("a").unwrap().value, "x");
    }

    #[test]
    fn sibling_roots() {
        let doc = parse("<a>1</a><b>2</b>").unwrap();
        assert_eq!(doc.roots().len(), 2);
        assert_eq!(doc.find("b").unwrap().value, "2");
    }

    #[test]
    fn value_unescapes_and_normalizes() {
        let doc = parse(r"<t>line\nnext</t>").unwrap();
        assert_eq!(doc.find("t").unwrap().value, "line\nnext");

        // U+0065 U+0301 composes to U+00E9 under NFC
        let doc = parse("<t>cafe\u{301}</t>").unwrap();
        assert_eq!(doc.find("t").unwrap().value, "café");
    }

    #[test]
    fn self_closing_with_attributes() {
        let doc = parse(r#"<hr kind="soft"/>"#).unwrap();
        let hr = doc.find("hr").unwrap();
        assert!(hr.complete);
        assert_eq!(hr.attr("kind"), Some("soft"));
        assert!(hr.raw.is_empty());
    }

    #[test]
    fn empty_input() {
        let doc = parse("").unwrap();
        assert!(doc.roots().is_empty());
    }
}
