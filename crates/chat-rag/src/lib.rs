//! chat-rag: document chat assistant with word-streamed answers
//!
//! Documents in a folder are parsed, chunked, embedded through Ollama and kept in a
//! persisted vector index. Questions arrive over a WebSocket chat session and are
//! answered either from a static Q&A table or by a conversational retrieval chain.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod knowledge;
pub mod providers;
pub mod resolver;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::ChatServer;
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    message::{ChatMessage, Role},
};
