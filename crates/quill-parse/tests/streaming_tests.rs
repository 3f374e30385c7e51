//! Integration tests: parser behavior over growing buffers

use proptest::prelude::*;
use quill_parse::{parse, parse_kv, StreamBuffer, Tag};

#[test]
fn orphan_recovery_across_chunks() {
    let mut buf = StreamBuffer::new();
    buf.push_chunk(b"<a><b>x</b><c>y");

    let doc = buf.parse_markup().unwrap();
    let a = doc.find("a").unwrap();
    assert!(!a.complete);
    assert_eq!(a.find("b").unwrap().value, "x");
    assert!(!a.find("c").unwrap().complete);
    assert_eq!(a.find("c").unwrap().value, "y");

    buf.push_chunk(b"</a>");
    let doc = buf.parse_markup().unwrap();
    assert_eq!(doc.roots().len(), 1);

    let a = doc.find("a").unwrap();
    assert!(a.complete);
    // b kept its own close; c is now a completed child of a, not a sibling
    let keys: Vec<_> = a.children.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "c"]);
    assert_eq!(a.find("b").unwrap().value, "x");
    assert!(a.find("c").unwrap().complete);
}

#[test]
fn every_prefix_of_well_formed_input_parses() {
    let input = r#"<response note="draft"><section>First part</section><section>Second</section></response>"#;

    for end in input
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(input.len()))
    {
        let doc = parse(&input[..end]).unwrap_or_else(|e| panic!("prefix {end} errored: {e}"));

        if let Some(response) = doc.find("response") {
            // Complete exactly once the closing tag has streamed in
            assert_eq!(response.complete, end == input.len(), "prefix {end}");

            for section in response.find_all("section") {
                if section.complete {
                    assert!(
                        section.value == "First part" || section.value == "Second",
                        "prefix {end} produced wrong value {:?}",
                        section.value
                    );
                }
            }
        }
    }
}

#[test]
fn complete_tags_reconstruct_their_markup() {
    let input = r#"<section id="intro">Call me Ishmael.</section>"#;
    let doc = parse(input).unwrap();
    let section = doc.find("section").unwrap();
    assert!(section.complete);

    let attrs: String = section
        .attributes
        .iter()
        .map(|(k, v)| format!(r#" {k}="{v}""#))
        .collect();
    let rebuilt = format!("<{}{attrs}>{}</{}>", section.key, section.raw, section.key);
    assert_eq!(rebuilt, input);
}

#[test]
fn streamed_kv_only_completes_on_terminators() {
    let full = r#"{"title": "Whales", "body": "They swim.", "rank": 7}"#;

    let mut completed_so_far = 0;
    for end in 0..=full.len() {
        if !full.is_char_boundary(end) {
            continue;
        }
        let parsed = parse_kv(&full[..end]).unwrap();

        // Completed keys only grow, and their values are final
        assert!(parsed.completed_keys.len() >= completed_so_far);
        completed_so_far = parsed.completed_keys.len();

        let final_parse = parse_kv(full).unwrap();
        for key in &parsed.completed_keys {
            assert_eq!(parsed.get(key), final_parse.get(key), "key {key} at {end}");
        }
    }

    assert_eq!(completed_so_far, 3);
}

/// Raw spans must always index back into the exact input substring
fn assert_spans_consistent(input: &str, tags: &[Tag]) {
    for tag in tags {
        if !tag.raw.is_empty() {
            assert_eq!(
                &input[tag.span.start..tag.span.end],
                tag.raw,
                "span mismatch for tag {}",
                tag.key
            );
        }
        assert_spans_consistent(input, &tag.children);
    }
}

proptest! {
    #[test]
    fn arbitrary_prefixes_never_error(
        names in proptest::collection::vec("[a-z]{1,8}", 1..4),
        values in proptest::collection::vec("[a-zA-Z0-9 .,]{0,20}", 1..4),
        cut in 0usize..200,
    ) {
        let mut input = String::new();
        for (name, value) in names.iter().zip(values.iter()) {
            input.push_str(&format!("<{name}>{value}</{name}>"));
        }

        let mut end = cut.min(input.len());
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        let prefix = &input[..end];

        let doc = parse(prefix).unwrap();
        assert_spans_consistent(prefix, doc.roots());
    }

    #[test]
    fn kv_partial_values_are_prefixes_of_final(
        value in "[a-zA-Z0-9 ]{0,24}",
        cut in 0usize..40,
    ) {
        let full = format!(r#"{{"text": "{value}"}}"#);
        let mut end = cut.min(full.len());
        while !full.is_char_boundary(end) {
            end -= 1;
        }

        let partial = parse_kv(&full[..end]).unwrap();
        if let Some(seen) = partial.get("text") {
            prop_assert!(value.starts_with(seen), "{seen:?} not a prefix of {value:?}");
        }
    }
}
