use serde::{Deserialize, Serialize};

use crate::matching::{normalize, query_words};

/// Additive relevance weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Whole query found in the title
    pub title_phrase: u32,
    /// Whole query found in the content
    pub content_phrase: u32,
    /// Per query word found in the title
    pub title_word: u32,
    /// Per query word found in the content
    pub content_word: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title_phrase: 100,
            content_phrase: 50,
            title_word: 10,
            content_word: 5,
        }
    }
}

/// Score a document against `query`.
///
/// Inputs are normalized here, so callers may pass raw text. There is no
/// length normalization: a long document with many hits is not penalized.
/// The sum saturates at `u32::MAX`.
pub fn relevance(title: &str, content: &str, query: &str, weights: &ScoreWeights) -> u32 {
    let title = normalize(title);
    let content = normalize(content);
    let query = normalize(query);

    let mut score: u32 = 0;

    if title.contains(&query) {
        score = score.saturating_add(weights.title_phrase);
    }
    if content.contains(&query) {
        score = score.saturating_add(weights.content_phrase);
    }

    for word in query_words(&query) {
        if title.contains(&word) {
            score = score.saturating_add(weights.title_word);
        }
        if content.contains(&word) {
            score = score.saturating_add(weights.content_word);
        }
    }

    score
}
