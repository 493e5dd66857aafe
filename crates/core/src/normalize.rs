//! Text normalization for extracted document text.
//!
//! Handles Unicode composition, line ending normalization, whitespace
//! collapsing and blank-line squeezing, while keeping paragraph breaks.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple spaces or tabs into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

/// Regex matching two or more consecutive blank lines.
static BLANK_LINES_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Control characters that survive some extractors and carry no text.
const STRIP_CHARS: &[char] = &['\u{0000}', '\u{FEFF}', '\u{200B}', '\u{00AD}'];

/// Text normalizer for extracted document text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Whether to collapse tabs as well as spaces. Tabs separate table cells
    /// in DOCX output, so callers may want to keep them.
    collapse_tabs: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Create a new text normalizer with default settings.
    pub fn new() -> Self {
        Self { collapse_tabs: true }
    }

    /// Set whether tabs are collapsed together with spaces.
    pub fn with_collapse_tabs(mut self, collapse: bool) -> Self {
        self.collapse_tabs = collapse;
        self
    }

    /// Normalize a block of extracted text.
    ///
    /// - Composes Unicode to NFC
    /// - Converts `\r\n` and `\r` to `\n`
    /// - Removes zero-width and soft-hyphen characters
    /// - Collapses runs of horizontal whitespace and trims each line
    /// - Squeezes runs of blank lines down to one blank line
    pub fn normalize(&self, text: &str) -> String {
        let composed: String = text
            .nfc()
            .filter(|c| !STRIP_CHARS.contains(c))
            .collect();
        let unified = composed.replace("\r\n", "\n").replace('\r', "\n");

        let lines: Vec<String> = unified.lines().map(|line| self.collapse_line(line)).collect();

        let joined = lines.join("\n");
        BLANK_LINES_REGEX
            .replace_all(joined.trim_matches('\n'), "\n\n")
            .to_string()
    }

    fn collapse_line(&self, line: &str) -> String {
        if self.collapse_tabs {
            WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string()
        } else {
            line.split('\t')
                .map(|cell| WHITESPACE_COLLAPSE_REGEX.replace_all(cell, " ").trim().to_string())
                .collect::<Vec<_>>()
                .join("\t")
        }
    }
}
