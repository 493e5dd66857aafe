//! Spelling and grammar suggestions.
//!
//! A [`SuggestionChecker`] truncates its input, runs one [`CheckStrategy`]
//! against a [`Corrector`] backend, adds the commonly-confused word scan,
//! and caps the number of issues returned.

pub mod confusion;
pub mod corrector;
pub mod sentence;
pub mod span;

pub use confusion::find_confusions;
pub use corrector::{Corrector, DictionaryCorrector};
pub use sentence::SentenceDiff;
pub use span::SpanDiff;

use crate::error::Result;
use crate::types::Issue;

/// Default number of input characters checked.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;

/// Default maximum number of issues returned.
pub const DEFAULT_MAX_ISSUES: usize = 50;

/// A way of turning corrected text into issues.
pub trait CheckStrategy {
    /// Short name, as accepted on the command line.
    fn name(&self) -> &'static str;

    fn find_issues(&self, text: &str, corrector: &dyn Corrector) -> Result<Vec<Issue>>;
}

/// The two built-in strategies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Sentence,
    Span,
}

impl StrategyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sentence" | "sentences" => Some(Self::Sentence),
            "span" | "spans" | "diff" => Some(Self::Span),
            _ => None,
        }
    }

    pub fn build(&self) -> Box<dyn CheckStrategy> {
        match self {
            Self::Sentence => Box::new(SentenceDiff),
            Self::Span => Box::new(SpanDiff),
        }
    }
}

/// Suggestion checker with a pluggable strategy and correction backend.
pub struct SuggestionChecker {
    strategy: Box<dyn CheckStrategy>,
    corrector: Box<dyn Corrector>,
    max_input_chars: usize,
    max_issues: usize,
}

impl Default for SuggestionChecker {
    fn default() -> Self {
        Self::new(Box::new(SentenceDiff), Box::new(DictionaryCorrector::new()))
    }
}

impl SuggestionChecker {
    pub fn new(strategy: Box<dyn CheckStrategy>, corrector: Box<dyn Corrector>) -> Self {
        Self {
            strategy,
            corrector,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            max_issues: DEFAULT_MAX_ISSUES,
        }
    }

    /// Set how many characters of input are checked.
    pub fn with_max_input_chars(mut self, chars: usize) -> Self {
        self.max_input_chars = chars;
        self
    }

    /// Set the maximum number of issues returned.
    pub fn with_max_issues(mut self, issues: usize) -> Self {
        self.max_issues = issues;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Check `text`, returning the backend error if correction fails.
    pub fn try_check(&self, text: &str) -> Result<Vec<Issue>> {
        let text = truncate_chars(text, self.max_input_chars);

        let mut issues = self.strategy.find_issues(text, self.corrector.as_ref())?;
        issues.extend(find_confusions(text));
        issues.truncate(self.max_issues);

        log::debug!(
            "{} strategy found {} issue(s) in {} chars",
            self.strategy.name(),
            issues.len(),
            text.chars().count()
        );
        Ok(issues)
    }

    /// Check `text`. A failing backend is logged and yields no issues.
    pub fn check(&self, text: &str) -> Vec<Issue> {
        match self.try_check(text) {
            Ok(issues) => issues,
            Err(e) => {
                log::error!("Grammar check failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// The longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Up to `width` characters of `text` on each side of `start..end`, with
/// line breaks flattened to spaces.
pub(crate) fn context_window(text: &str, start: usize, end: usize, width: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(width)
        .last()
        .map_or(start, |(idx, _)| idx);
    let to = text[end..]
        .char_indices()
        .nth(width)
        .map_or(text.len(), |(idx, _)| end + idx);

    text[from..to].replace(['\n', '\r'], " ").trim().to_string()
}
