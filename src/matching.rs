//! Text matching primitives used by the search service.
//!
//! All offsets in this module are character offsets, not byte offsets, so
//! snippets can be cut anywhere without landing inside a multi-byte char.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Trim and lower-case text for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Split an already normalized query into its words.
pub fn query_words(normalized_query: &str) -> Vec<String> {
    normalized_query
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Single-char case fold so folded text stays aligned with the original.
/// Final sigma folds like any other sigma.
fn fold(c: char) -> char {
    match c.to_lowercase().next().unwrap_or(c) {
        'ς' => 'σ',
        lower => lower,
    }
}

/// Build the subsequence pattern for one query word: every character is
/// escaped and a greedy `.*` sits between consecutive characters.
///
/// `"trl"` becomes `t.*r.*l`, which finds `trail`.
pub fn fuzzy_pattern(word: &str) -> Result<Regex, regex::Error> {
    let pattern = word
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect::<Vec<_>>()
        .join(".*");

    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

/// Compiled fuzzy patterns for every word of a query.
///
/// Built once per search and reused for every document.
#[derive(Debug)]
pub struct FuzzyMatcher {
    patterns: Vec<Option<Regex>>,
}

impl FuzzyMatcher {
    pub fn new(words: &[String]) -> Self {
        let patterns = words
            .iter()
            .map(|word| match fuzzy_pattern(word) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Fuzzy pattern for '{}' failed to compile: {}", word, e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// True when every word fuzzily matches `content`.
    /// A word whose pattern failed to compile never matches.
    pub fn matches(&self, content: &str) -> bool {
        !self.patterns.is_empty()
            && self
                .patterns
                .iter()
                .all(|p| p.as_ref().is_some_and(|re| re.is_match(content)))
    }
}

/// Convenience wrapper over [`fuzzy_pattern`] for a single word.
pub fn fuzzy_matches(word: &str, content: &str) -> bool {
    fuzzy_pattern(word).is_ok_and(|re| re.is_match(content))
}

fn occurrences(haystack: &[char], needle: &[char]) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return found;
    }

    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if haystack[pos..pos + needle.len()] == *needle {
            found.push(pos);
        }
        pos += 1;
    }
    found
}

/// Character offsets of every case-insensitive literal occurrence of `word`
/// in `content`, overlapping ones included.
pub fn find_occurrences(content: &str, word: &str) -> Vec<usize> {
    let haystack: Vec<char> = content.chars().map(fold).collect();
    let needle: Vec<char> = word.chars().map(fold).collect();
    occurrences(&haystack, &needle)
}

/// Cut a context snippet around every occurrence of every word.
///
/// Each snippet holds up to `context_length` characters on both sides of
/// the occurrence, clamped to the content bounds. Identical snippets are
/// kept once, in first-seen order.
///
/// Pass the words as the user typed them: both sides go through the same
/// per-char fold, so `İ` or a final `ς` line up with the content.
pub fn extract_snippets(content: &str, words: &[String], context_length: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();

    let mut seen = HashSet::new();
    let mut snippets = Vec::new();

    for word in words {
        let needle: Vec<char> = word.chars().map(fold).collect();
        for start in occurrences(&folded, &needle) {
            let from = start.saturating_sub(context_length);
            let to = (start + needle.len() + context_length).min(chars.len());
            let snippet: String = chars[from..to].iter().collect();

            if seen.insert(snippet.clone()) {
                snippets.push(snippet);
            }
        }
    }

    snippets
}
