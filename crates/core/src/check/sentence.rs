//! Sentence-correction diff strategy.

use super::{CheckStrategy, Corrector};
use crate::error::Result;
use crate::types::{Issue, IssueKind};
use unicode_segmentation::UnicodeSegmentation;

/// Number of characters of the original sentence shown as context.
const CONTEXT_PREFIX_CHARS: usize = 50;

/// Corrects each sentence on its own and reports every sentence that
/// changed, with the corrected sentence as the suggestion.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceDiff;

impl CheckStrategy for SentenceDiff {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn find_issues(&self, text: &str, corrector: &dyn Corrector) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();

        for sentence in text.unicode_sentences() {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            let corrected = corrector.correct(sentence)?;
            if corrected != sentence {
                issues.push(Issue::new(
                    IssueKind::Grammar,
                    sentence,
                    corrected,
                    sentence_context(sentence),
                ));
            }
        }

        Ok(issues)
    }
}

fn sentence_context(sentence: &str) -> String {
    let prefix: String = sentence.chars().take(CONTEXT_PREFIX_CHARS).collect();
    format!("{}...", prefix.replace('\n', " "))
}
