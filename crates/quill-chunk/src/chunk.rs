//! Block grouping and greedy merge
//!
//! Two passes: collect maximal runs of content blocks between paragraph
//! breaks, then greedily merge consecutive runs while the combined cost
//! stays within the token budget.

use crate::tokens::estimate_tokens;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One position-addressable unit of a document
///
/// A block whose text is empty or whitespace-only acts as a paragraph-break
/// marker: it separates runs and is consumed by chunking rather than
/// rendered into any chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Opaque position id, meaningful only to the document owner
    pub id: String,
    /// The block's text content
    pub text: String,
}

impl Block {
    /// Create a block
    #[inline]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Whether this block is a paragraph-break marker
    #[inline]
    #[must_use]
    pub fn is_break(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous span of the document sized for one edit
///
/// `start` and `end` are the ids of the span's first and last block;
/// consumers must treat them as opaque addressable positions, not offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTarget {
    /// Id of the first block in the span
    pub start: String,
    /// Id of the last block in the span
    pub end: String,
    /// Rendered text of the span
    pub text: String,
    /// Estimated token cost of `text`
    pub estimated_tokens: u32,
}

/// Partition `blocks` into edit spans no larger than `token_budget`
///
/// The budget is a merge ceiling, not a hard cap: a single run that alone
/// exceeds it is still emitted whole. A document producing zero candidate
/// runs yields zero targets.
#[must_use]
pub fn chunk(blocks: &[Block], token_budget: u32) -> Vec<EditTarget> {
    let candidates = collect_runs(blocks);
    let targets = merge_runs(candidates, token_budget);

    debug!(
        blocks = blocks.len(),
        targets = targets.len(),
        token_budget,
        "chunked document"
    );
    targets
}

/// Pass 1: maximal runs of content blocks become candidate chunks
fn collect_runs(blocks: &[Block]) -> Vec<EditTarget> {
    let mut candidates = Vec::new();
    let mut run: Vec<&Block> = Vec::new();

    for block in blocks {
        if block.is_break() {
            close_run(&mut candidates, &mut run);
        } else {
            run.push(block);
        }
    }
    close_run(&mut candidates, &mut run);

    candidates
}

fn close_run(candidates: &mut Vec<EditTarget>, run: &mut Vec<&Block>) {
    let Some(first) = run.first() else {
        return;
    };
    let last = run.last().expect("non-empty run has a last block");

    let text = run
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    candidates.push(EditTarget {
        start: first.id.clone(),
        end: last.id.clone(),
        estimated_tokens: estimate_tokens(&text),
        text,
    });
    run.clear();
}

/// Pass 2: greedy merge of consecutive candidates under the budget
fn merge_runs(candidates: Vec<EditTarget>, token_budget: u32) -> Vec<EditTarget> {
    let mut targets: Vec<EditTarget> = Vec::new();

    for candidate in candidates {
        match targets.last_mut() {
            Some(group)
                if group.estimated_tokens + candidate.estimated_tokens <= token_budget =>
            {
                group.end = candidate.end;
                group.text.push_str("\n\n");
                group.text.push_str(&candidate.text);
                group.estimated_tokens += candidate.estimated_tokens;
            }
            _ => targets.push(candidate),
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blocks(specs: &[(&str, &str)]) -> Vec<Block> {
        specs.iter().map(|(id, text)| Block::new(*id, *text)).collect()
    }

    #[test]
    fn empty_document_yields_zero_targets() {
        assert!(chunk(&[], 100).is_empty());

        // Only break markers is still zero content
        let only_breaks = blocks(&[("b1", ""), ("b2", "   \n")]);
        assert!(chunk(&only_breaks, 100).is_empty());
    }

    #[test]
    fn single_run_spans_its_blocks() {
        let doc = blocks(&[("b1", "First line."), ("b2", "Second line.")]);
        let targets = chunk(&doc, 100);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].start, "b1");
        assert_eq!(targets[0].end, "b2");
        assert_eq!(targets[0].text, "First line.\nSecond line.");
    }

    #[test]
    fn break_markers_split_runs() {
        let doc = blocks(&[("b1", "one"), ("b2", ""), ("b3", "two")]);

        // Budget of zero forbids all merging
        let targets = chunk(&doc, 0);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].end, "b1");
        assert_eq!(targets[1].start, "b3");
    }

    #[test]
    fn greedy_merge_under_budget() {
        let doc = blocks(&[
            ("b1", "alpha beta gamma"),
            ("b2", ""),
            ("b3", "delta epsilon"),
            ("b4", ""),
            ("b5", "zeta eta theta iota"),
        ]);
        // Costs: 4, 3, 5. Budget 8 fits the first two, not the third.
        let targets = chunk(&doc, 8);

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].start, "b1");
        assert_eq!(targets[0].end, "b3");
        assert_eq!(targets[0].estimated_tokens, 7);
        assert_eq!(targets[0].text, "alpha beta gamma\n\ndelta epsilon");
        assert_eq!(targets[1].start, "b5");
        assert_eq!(targets[1].estimated_tokens, 5);
    }

    #[test]
    fn oversized_run_is_emitted_whole() {
        let doc = blocks(&[("b1", "a b c d e f g h i j k l m n o p")]);
        let targets = chunk(&doc, 5);

        assert_eq!(targets.len(), 1);
        assert!(targets[0].estimated_tokens > 5);
        assert_eq!(targets[0].start, "b1");
        assert_eq!(targets[0].end, "b1");
    }

    #[test]
    fn targets_do_not_overlap_and_preserve_content() {
        let doc = blocks(&[
            ("b1", "First paragraph."),
            ("b2", "Still the first."),
            ("b3", "  "),
            ("b4", "Second paragraph."),
            ("b5", ""),
            ("b6", "Third paragraph."),
        ]);
        // Costs: 7, 3, 3. Budget 10 merges the first two runs only.
        let targets = chunk(&doc, 10);

        // Every content block id appears in exactly one target's span
        let spans: Vec<(&str, &str)> = targets
            .iter()
            .map(|t| (t.start.as_str(), t.end.as_str()))
            .collect();
        assert_eq!(spans, vec![("b1", "b4"), ("b6", "b6")]);

        // Concatenated text reconstructs the content, breaks consumed
        let joined = targets
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let expected =
            "First paragraph.\nStill the first.\n\nSecond paragraph.\n\nThird paragraph.";
        assert_eq!(joined, expected);
    }

    #[test]
    fn merged_cost_is_sum_of_run_costs() {
        let doc = blocks(&[("b1", "one two"), ("b2", ""), ("b3", "three four")]);
        let targets = chunk(&doc, 100);

        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0].estimated_tokens,
            estimate_tokens("one two") + estimate_tokens("three four")
        );
    }
}
