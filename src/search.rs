use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::matching::{extract_snippets, normalize, query_words, FuzzyMatcher};
use crate::scoring::{relevance, ScoreWeights};

/// Content category of an indexed document.
///
/// The four campaign collections have their own variants; anything else a
/// caller registers is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    Story,
    Quest,
    Npc,
    Location,
    Other(String),
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Story => "story",
            Self::Quest => "quest",
            Self::Npc => "npc",
            Self::Location => "location",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for DocumentType {
    fn from(value: &str) -> Self {
        match value {
            "story" => Self::Story,
            "quest" => Self::Quest,
            "npc" => Self::Npc,
            "location" => Self::Location,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DocumentType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<DocumentType> for String {
    fn from(value: DocumentType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened, searchable view of one campaign entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    /// All searchable text fields joined together
    pub content: String,
    /// Display fields; `title` is the only one that takes part in matching
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchDocument {
    pub fn new(
        id: impl Into<String>,
        doc_type: DocumentType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut metadata = Map::new();
        metadata.insert("title".to_string(), Value::String(title.into()));
        Self {
            id: id.into(),
            doc_type,
            content: content.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Title from metadata, empty when missing or not a string.
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub title: String,
    pub content: String,
    /// Context snippets around each query word occurrence, deduplicated
    pub matches: Vec<String>,
}

/// Ranked results for one document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGroup {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub results: Vec<SearchResult>,
}

/// Text that relevance is computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceBasis {
    /// The user's normalized query
    #[default]
    Query,
    /// The first extracted snippet, treated as if it were the query.
    /// Kept for parity with the ranking of the earlier web client.
    FirstSnippet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Characters of context kept on each side of a match
    pub context_length: usize,
    /// Shorter (trimmed) queries return nothing
    pub min_query_length: usize,
    pub max_results_per_type: usize,
    /// Also accept subsequence matches against the content
    pub fuzzy_match: bool,
    pub weights: ScoreWeights,
    pub relevance_basis: RelevanceBasis,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            context_length: 50,
            min_query_length: 2,
            max_results_per_type: 10,
            fuzzy_match: true,
            weights: ScoreWeights::default(),
            relevance_basis: RelevanceBasis::default(),
        }
    }
}

/// In-memory search index over campaign documents, bucketed by type.
///
/// Not internally synchronized; wrap it in a lock to share it.
#[derive(Debug, Clone, Default)]
pub struct SearchService {
    options: SearchOptions,
    index: BTreeMap<DocumentType, Vec<SearchDocument>>,
}

impl SearchService {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            index: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Replace the whole index. The bucket key wins over each document's
    /// own `doc_type`.
    pub fn initialize_index<I>(&mut self, documents_by_type: I)
    where
        I: IntoIterator<Item = (DocumentType, Vec<SearchDocument>)>,
    {
        let mut index = BTreeMap::new();
        for (doc_type, mut documents) in documents_by_type {
            for doc in &mut documents {
                doc.doc_type = doc_type.clone();
            }
            index.entry(doc_type).or_insert_with(Vec::new).extend(documents);
        }
        self.index = index;

        tracing::debug!(
            "Search index replaced: {} documents across {} types",
            self.document_count(),
            self.index.len()
        );
    }

    /// Append a document. Ids are not checked for duplicates.
    pub fn add_document(&mut self, document: SearchDocument) {
        self.index
            .entry(document.doc_type.clone())
            .or_default()
            .push(document);
    }

    pub fn remove_document(&mut self, doc_type: &DocumentType, id: &str) {
        if let Some(documents) = self.index.get_mut(doc_type) {
            documents.retain(|doc| doc.id != id);
        }
    }

    pub fn clear_index(&mut self) {
        self.index.clear();
    }

    pub fn document_count(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    pub fn type_count(&self, doc_type: &DocumentType) -> usize {
        self.index.get(doc_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.document_count() == 0
    }

    /// Ranked results of every type, concatenated in type order.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_grouped(query)
            .into_iter()
            .flat_map(|group| group.results)
            .collect()
    }

    /// Ranked results per type. Types without hits are left out.
    pub fn search_grouped(&self, query: &str) -> Vec<ResultGroup> {
        let normalized = normalize(query);
        if normalized.is_empty() || normalized.chars().count() < self.options.min_query_length {
            return Vec::new();
        }

        let words = query_words(&normalized);
        // Snippets fold the raw words char by char, the same way they fold the content
        let snippet_words: Vec<String> = query.split_whitespace().map(str::to_string).collect();
        let fuzzy = self.options.fuzzy_match.then(|| FuzzyMatcher::new(&words));

        let mut groups = Vec::new();
        for (doc_type, documents) in &self.index {
            let mut scored: Vec<(u32, SearchResult)> = documents
                .iter()
                .filter(|doc| is_match(doc, &normalized, fuzzy.as_ref()))
                .map(|doc| self.score(doc, &normalized, &snippet_words))
                .collect();

            // sort_by is stable, so equal scores keep scan order
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.truncate(self.options.max_results_per_type);

            if scored.is_empty() {
                continue;
            }

            groups.push(ResultGroup {
                doc_type: doc_type.clone(),
                results: scored.into_iter().map(|(_, result)| result).collect(),
            });
        }

        tracing::debug!(
            "Search '{}' matched {} results in {} groups",
            normalized,
            groups.iter().map(|g| g.results.len()).sum::<usize>(),
            groups.len()
        );

        groups
    }

    fn score(
        &self,
        doc: &SearchDocument,
        normalized: &str,
        words: &[String],
    ) -> (u32, SearchResult) {
        let matches = extract_snippets(&doc.content, words, self.options.context_length);

        let basis = match self.options.relevance_basis {
            RelevanceBasis::Query => normalized,
            RelevanceBasis::FirstSnippet => matches.first().map_or("", String::as_str),
        };
        let score = relevance(doc.title(), &doc.content, basis, &self.options.weights);

        let result = SearchResult {
            id: doc.id.clone(),
            doc_type: doc.doc_type.clone(),
            title: doc.title().to_string(),
            content: doc.content.clone(),
            matches,
        };
        (score, result)
    }
}

fn is_match(doc: &SearchDocument, normalized: &str, fuzzy: Option<&FuzzyMatcher>) -> bool {
    normalize(doc.title()).contains(normalized)
        || normalize(&doc.content).contains(normalized)
        || fuzzy.is_some_and(|f| f.matches(&doc.content))
}
