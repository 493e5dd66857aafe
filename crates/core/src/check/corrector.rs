//! Correction backends used by the suggestion checker.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Regex matching a word, including inner apostrophes (don't, they're).
static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+(?:['\u{2019}][A-Za-z]+)*").unwrap());

/// Built-in table of common misspellings, one `wrong right` pair per line.
const BUILTIN_MISSPELLINGS: &str = include_str!("../../data/misspellings.txt");

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Words longer than this only get distance-1 candidates.
const MAX_EDITS2_LEN: usize = 20;

/// A text correction backend.
///
/// Implementations return the corrected form of the whole input. An error
/// means the backend itself failed, not that the text has mistakes.
pub trait Corrector {
    fn correct(&self, text: &str) -> Result<String>;
}

impl<C: Corrector + ?Sized> Corrector for Box<C> {
    fn correct(&self, text: &str) -> Result<String> {
        (**self).correct(text)
    }
}

/// Dictionary-driven word corrector.
///
/// Always applies a table of common misspellings. When a word-frequency
/// dictionary is loaded, unknown words are replaced by the most frequent
/// known word within one edit, else two edits.
#[derive(Debug, Clone)]
pub struct DictionaryCorrector {
    misspellings: HashMap<String, String>,
    frequencies: Option<HashMap<String, u64>>,
}

impl Default for DictionaryCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryCorrector {
    /// Create a corrector with only the built-in misspelling table.
    pub fn new() -> Self {
        Self {
            misspellings: parse_misspellings(BUILTIN_MISSPELLINGS),
            frequencies: None,
        }
    }

    /// Load a word-frequency dictionary from a file.
    pub fn with_dictionary_file(self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::CheckerError(format!(
                "Failed to read dictionary {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(self.with_frequencies(&content))
    }

    /// Add a word-frequency dictionary: one `word [count]` entry per line.
    ///
    /// Missing counts default to 1; repeated words accumulate.
    pub fn with_frequencies(mut self, content: &str) -> Self {
        let mut frequencies = self.frequencies.take().unwrap_or_default();

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            if word.starts_with('#') {
                continue;
            }
            let count = parts.next().and_then(|c| c.parse::<u64>().ok()).unwrap_or(1);
            *frequencies.entry(word.to_lowercase()).or_insert(0) += count;
        }

        log::debug!("Loaded dictionary with {} words", frequencies.len());
        self.frequencies = Some(frequencies);
        self
    }

    /// Number of words in the frequency dictionary.
    pub fn dictionary_len(&self) -> usize {
        self.frequencies.as_ref().map_or(0, HashMap::len)
    }

    /// Return the replacement for a single word, or `None` if it is fine.
    pub fn correct_word(&self, word: &str) -> Option<String> {
        // Acronyms and shouted words are left alone.
        if word.chars().count() > 1 && word.chars().all(|c| !c.is_lowercase()) {
            return None;
        }

        let lower = word.to_lowercase().replace('\u{2019}', "'");

        let replacement = match self.misspellings.get(&lower) {
            Some(fixed) => fixed.clone(),
            None => self.most_likely(&lower)?,
        };

        if replacement == lower {
            return None;
        }

        Some(match_case(word, &replacement))
    }

    fn most_likely(&self, word: &str) -> Option<String> {
        let frequencies = self.frequencies.as_ref()?;

        if word.contains('\'') || frequencies.contains_key(word) {
            return None;
        }

        let first = edits1(word);
        if let Some(best) = best_known(first.iter().map(String::as_str), frequencies) {
            return Some(best);
        }

        if word.chars().count() > MAX_EDITS2_LEN {
            return None;
        }

        let second: Vec<String> = first.iter().flat_map(|e| edits1(e)).collect();
        best_known(second.iter().map(String::as_str), frequencies)
    }
}

impl Corrector for DictionaryCorrector {
    fn correct(&self, text: &str) -> Result<String> {
        let corrected = WORD_REGEX.replace_all(text, |caps: &regex::Captures| {
            let word = &caps[0];
            self.correct_word(word).unwrap_or_else(|| word.to_string())
        });
        Ok(corrected.into_owned())
    }
}

fn parse_misspellings(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (wrong, right) = line.split_once(char::is_whitespace)?;
            Some((wrong.to_lowercase(), right.trim().to_string()))
        })
        .collect()
}

/// Pick the most frequent known candidate. Ties go to the alphabetically
/// smallest word so results are stable.
fn best_known<'a>(
    candidates: impl Iterator<Item = &'a str>,
    frequencies: &HashMap<String, u64>,
) -> Option<String> {
    candidates
        .filter_map(|c| frequencies.get(c).map(|&count| (c, count)))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(word, _)| word.to_string())
}

/// All strings one delete, transpose, replace or insert away from `word`.
fn edits1(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut edits = Vec::with_capacity(54 * (chars.len() + 1));

    for i in 0..=chars.len() {
        let (left, right) = chars.split_at(i);

        if !right.is_empty() {
            edits.push(left.iter().chain(&right[1..]).collect());
        }

        if right.len() > 1 {
            let mut swapped = left.to_vec();
            swapped.push(right[1]);
            swapped.push(right[0]);
            swapped.extend_from_slice(&right[2..]);
            edits.push(swapped.into_iter().collect());
        }

        for c in ALPHABET.chars() {
            if !right.is_empty() {
                edits.push(
                    left.iter()
                        .copied()
                        .chain(std::iter::once(c))
                        .chain(right[1..].iter().copied())
                        .collect(),
                );
            }
            edits.push(
                left.iter()
                    .copied()
                    .chain(std::iter::once(c))
                    .chain(right.iter().copied())
                    .collect(),
            );
        }
    }

    edits
}

/// Give `replacement` the case shape of `original`.
fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = original.chars();
    let first_upper = chars.next().is_some_and(char::is_uppercase);
    let rest_upper = original.chars().count() > 1 && chars.all(|c| !c.is_lowercase());

    if first_upper && rest_upper {
        replacement.to_uppercase()
    } else if first_upper {
        let mut out = String::with_capacity(replacement.len());
        let mut rchars = replacement.chars();
        if let Some(first) = rchars.next() {
            out.extend(first.to_uppercase());
        }
        out.extend(rchars);
        out
    } else {
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let corrector = DictionaryCorrector::new();

        assert_eq!(corrector.correct_word("recieve"), Some("receive".to_string()));
        assert_eq!(corrector.correct_word("Teh"), Some("The".to_string()));
        assert_eq!(corrector.correct_word("house"), None);
    }

    #[test]
    fn test_correct_preserves_punctuation() {
        let corrector = DictionaryCorrector::new();

        let corrected = corrector
            .correct("I will recieve it tommorow, definately!")
            .unwrap();
        assert_eq!(corrected, "I will receive it tomorrow, definitely!");
    }

    #[test]
    fn test_multi_word_replacement() {
        let corrector = DictionaryCorrector::new();

        assert_eq!(corrector.correct("Thanks alot.").unwrap(), "Thanks a lot.");
    }

    #[test]
    fn test_acronyms_untouched() {
        let corrector = DictionaryCorrector::new().with_frequencies("the 100\nnasa 1");

        assert_eq!(corrector.correct_word("TEH"), None);
        assert_eq!(corrector.correct_word("NSA"), None);
    }

    #[test]
    fn test_frequency_dictionary() {
        let corrector = DictionaryCorrector::new()
            .with_frequencies("spelling 50\nspewing 2\ncorrect 30\nthe 1000\n");

        assert_eq!(corrector.dictionary_len(), 4);
        assert_eq!(corrector.correct_word("speling"), Some("spelling".to_string()));
        assert_eq!(corrector.correct_word("korrekt"), Some("correct".to_string()));
        assert_eq!(corrector.correct_word("the"), None);
        // Nothing within two edits: left as is.
        assert_eq!(corrector.correct_word("xylophone"), None);
    }

    #[test]
    fn test_frequency_ties_are_stable() {
        let corrector = DictionaryCorrector::new().with_frequencies("bat\ncat\n");

        assert_eq!(corrector.correct_word("aat"), Some("bat".to_string()));
    }

    #[test]
    fn test_missing_dictionary_file() {
        let err = DictionaryCorrector::new()
            .with_dictionary_file(Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::CheckerError(_)));
    }

    #[test]
    fn test_edits1_contains_basic_edits() {
        let edits = edits1("ab");
        assert!(edits.contains(&"b".to_string())); // delete
        assert!(edits.contains(&"ba".to_string())); // transpose
        assert!(edits.contains(&"cb".to_string())); // replace
        assert!(edits.contains(&"abc".to_string())); // insert
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("Recieve", "receive"), "Receive");
        assert_eq!(match_case("RECIEVE", "receive"), "RECEIVE");
        assert_eq!(match_case("recieve", "receive"), "receive");
    }
}
