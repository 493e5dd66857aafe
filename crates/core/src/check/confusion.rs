//! Commonly-confused word scan.
//!
//! Flags a group when two or more of its spellings appear anywhere in the
//! text. It does not check whether the words relate to each other.

use super::context_window;
use crate::types::{Issue, IssueKind};
use regex::Regex;
use std::sync::LazyLock;

/// Characters of original text shown on each side of the first match.
const CONTEXT_WINDOW_CHARS: usize = 30;

const CONFUSABLE_GROUPS: &[&[&str]] = &[
    &["their", "there", "they're"],
    &["your", "you're"],
    &["its", "it's"],
    &["affect", "effect"],
    &["then", "than"],
];

static GROUP_PATTERNS: LazyLock<Vec<Vec<(&'static str, Regex)>>> = LazyLock::new(|| {
    CONFUSABLE_GROUPS
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|word| {
                    let pattern = format!(r"(?i)\b{}\b", word.replace('\'', "['\u{2019}]"));
                    (*word, Regex::new(&pattern).unwrap())
                })
                .collect()
        })
        .collect()
});

/// Emit one issue per confusable group with at least two members present.
pub fn find_confusions(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    for group in GROUP_PATTERNS.iter() {
        let found: Vec<(&str, usize, usize)> = group
            .iter()
            .filter_map(|(word, regex)| regex.find(text).map(|m| (*word, m.start(), m.end())))
            .collect();

        if found.len() < 2 {
            continue;
        }

        let words: Vec<&str> = found.iter().map(|f| f.0).collect();
        let (_, start, end) = found
            .iter()
            .min_by_key(|f| f.1)
            .copied()
            .unwrap_or(found[0]);

        issues.push(Issue::new(
            IssueKind::CommonConfusion,
            words.join(" / "),
            format!("Check that {} are used correctly", quoted_list(&words)),
            context_window(text, start, end, CONTEXT_WINDOW_CHARS),
        ));
    }

    issues
}

fn quoted_list(words: &[&str]) -> String {
    let quoted: Vec<String> = words.iter().map(|w| format!("'{}'", w)).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}
