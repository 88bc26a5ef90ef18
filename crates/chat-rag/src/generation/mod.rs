//! Prompt construction and the conversational retrieval chain

mod chain;
mod prompt;

pub use chain::{ChainOutput, RetrievalChain};
pub use prompt::PromptBuilder;

#[cfg(test)]
pub(crate) use chain::tests;
