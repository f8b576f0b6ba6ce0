// Public modules for testing
pub mod config;
pub mod indexer;
pub mod matching;
pub mod scoring;
pub mod search;
pub mod server;

// Re-export main types
pub use search::{
    DocumentType, RelevanceBasis, ResultGroup, SearchDocument, SearchOptions, SearchResult,
    SearchService,
};
