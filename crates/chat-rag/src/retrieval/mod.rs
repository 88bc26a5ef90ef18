//! Persisted vector index and similarity search

mod search;

pub use search::{cosine_similarity, SearchResult, VectorIndex};
