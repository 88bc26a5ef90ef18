//! Core types for the chat service

pub mod document;
pub mod message;
pub mod protocol;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, FileType};
pub use message::{ChatMessage, Role};
pub use protocol::{ClientMessage, ServerMessage};
pub use response::{AskRequest, AskResponse};
