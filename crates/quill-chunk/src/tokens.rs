//! Token cost estimation
//!
//! Cheap word-count heuristic for budgeting prompt material without a
//! tokenizer dependency: roughly 1.3 tokens per word.

/// Tokens-per-word ratio of the estimate
const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token cost of `text`
///
/// A word is a maximal run of alphanumeric characters; whitespace,
/// punctuation in any script, and symbols all separate words. The estimate
/// is `round(words * 1.3)`.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .count();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (words as f64 * TOKENS_PER_WORD).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_rounds() {
        // 3 words * 1.3 = 3.9, rounds to 4
        assert_eq!(estimate_tokens("Call me Ishmael."), 4);
        // 10 words * 1.3 = 13 exactly
        assert_eq!(estimate_tokens("a b c d e f g h i j"), 13);
    }

    #[test]
    fn punctuation_splits_words() {
        // "re-parse" counts as two words
        assert_eq!(estimate_tokens("re-parse"), 3);
        assert_eq!(estimate_tokens("one,two;three"), 4);
    }

    #[test]
    fn unicode_punctuation_splits_words() {
        // Em dash and curly quotes are separators, not word characters
        assert_eq!(estimate_tokens("one\u{2014}two"), 3);
        assert_eq!(estimate_tokens("\u{201C}quoted\u{201D}"), 1);
        assert_eq!(estimate_tokens("it\u{2019}s fine"), 4);
    }

    #[test]
    fn empty_and_whitespace_cost_nothing() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("  \n\t  "), 0);
        assert_eq!(estimate_tokens("... -- !!"), 0);
    }
}
