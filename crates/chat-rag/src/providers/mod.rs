//! Provider abstractions for embeddings, LLM generation and vector storage
//!
//! The chat core only talks to these traits; `OllamaClient` and `LocalVectorStore`
//! are the local implementations.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{LlmProvider, TokenStream};
pub use local::LocalVectorStore;
pub use ollama::OllamaClient;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
