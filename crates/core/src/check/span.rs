//! Span-diff strategy: correct the whole text, then report each replaced
//! span of the minimal edit script between original and corrected tokens.

use super::{context_window, CheckStrategy, Corrector};
use crate::error::Result;
use crate::types::{Issue, IssueKind};
use regex::Regex;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::sync::LazyLock;

/// Characters of original text shown on each side of a replaced span.
const CONTEXT_WINDOW_CHARS: usize = 30;

/// Words (with inner apostrophes), whitespace runs, or single other chars.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['\u{2019}]\w+)*|\s+|[^\w\s]").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanDiff;

impl CheckStrategy for SpanDiff {
    fn name(&self) -> &'static str {
        "span"
    }

    fn find_issues(&self, text: &str, corrector: &dyn Corrector) -> Result<Vec<Issue>> {
        let corrected = corrector.correct(text)?;
        if corrected == text {
            return Ok(Vec::new());
        }

        let old_tokens = tokenize(text);
        let new_tokens = tokenize(&corrected);
        let old_words: Vec<&str> = old_tokens.iter().map(|t| t.1).collect();
        let new_words: Vec<&str> = new_tokens.iter().map(|t| t.1).collect();

        let mut issues = Vec::new();
        for op in capture_diff_slices(Algorithm::Myers, &old_words, &new_words) {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            if tag != DiffTag::Replace || old_range.is_empty() {
                continue;
            }

            let start = old_tokens[old_range.start].0;
            let last = &old_tokens[old_range.end - 1];
            let end = last.0 + last.1.len();

            let suggestion: String = new_words[new_range].concat();
            issues.push(Issue::new(
                IssueKind::Spelling,
                &text[start..end],
                suggestion,
                context_window(text, start, end, CONTEXT_WINDOW_CHARS),
            ));
        }

        Ok(issues)
    }
}

/// Split text into tokens, keeping each token's byte offset.
fn tokenize(text: &str) -> Vec<(usize, &str)> {
    TOKEN_REGEX
        .find_iter(text)
        .map(|m| (m.start(), m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::DictionaryCorrector;

    #[test]
    fn test_tokenize_covers_text() {
        let text = "Don't stop, ok?";
        let tokens = tokenize(text);
        let joined: String = tokens.iter().map(|t| t.1).collect();
        assert_eq!(joined, text);
        assert_eq!(tokens[0], (0, "Don't"));
    }

    #[test]
    fn test_one_issue_per_replaced_word() {
        let text = "We will recieve the goverment letter tommorow.";
        let issues = SpanDiff
            .find_issues(text, &DictionaryCorrector::new())
            .unwrap();

        let pairs: Vec<(&str, &str)> = issues
            .iter()
            .map(|i| (i.original.as_str(), i.suggestion.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("recieve", "receive"),
                ("goverment", "government"),
                ("tommorow", "tomorrow"),
            ]
        );
        assert!(issues.iter().all(|i| i.kind == IssueKind::Spelling));
    }

    #[test]
    fn test_context_window() {
        let text = format!("{} teh {}", "a".repeat(50), "b".repeat(50));
        let issues = SpanDiff
            .find_issues(&text, &DictionaryCorrector::new())
            .unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].original, "teh");
        assert_eq!(
            issues[0].context,
            format!("{} teh {}", "a".repeat(29), "b".repeat(29))
        );
    }

    #[test]
    fn test_no_diff_no_issues() {
        let issues = SpanDiff
            .find_issues("Nothing to fix here.", &DictionaryCorrector::new())
            .unwrap();
        assert!(issues.is_empty());
    }
}
