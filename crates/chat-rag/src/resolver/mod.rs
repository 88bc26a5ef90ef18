//! Answer resolvers
//!
//! A resolver turns a question (plus the session's earlier turns) into an answer.
//! `LookupResolver` scans a static Q&A table; `RetrievalResolver` runs the
//! retrieval chain over the ingested documents.

mod lookup;
mod retrieval;

pub use lookup::{LookupResolver, QnaEntry, QnaTable};
pub use retrieval::RetrievalResolver;

use async_trait::async_trait;

use crate::chat::ChatTurnHistory;
use crate::error::Result;
use crate::providers::{TokenStream, VectorSearchResult};

/// A resolved answer and the chunks backing it
#[derive(Debug, Clone, Default)]
pub struct Answer {
    pub text: String,
    /// Empty for lookup answers
    pub sources: Vec<VectorSearchResult>,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Outcome of resolving a question
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Answer),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Answer produced incrementally by the model
pub struct LiveAnswer {
    pub tokens: TokenStream,
    pub sources: Vec<VectorSearchResult>,
}

#[async_trait]
pub trait AnswerResolver: Send + Sync {
    /// Resolve a complete answer
    async fn resolve(&self, question: &str, turns: &ChatTurnHistory) -> Result<Resolution>;

    /// Open a token stream straight from the model.
    ///
    /// `None` means the resolver only produces complete answers.
    async fn resolve_live(&self, _question: &str, _turns: &ChatTurnHistory) -> Result<Option<LiveAnswer>> {
        Ok(None)
    }

    /// Resolver name for logging
    fn name(&self) -> &str;
}
