//! Retrieval-backed resolver

use async_trait::async_trait;

use crate::chat::ChatTurnHistory;
use crate::error::Result;
use crate::generation::RetrievalChain;

use super::{Answer, AnswerResolver, LiveAnswer, Resolution};

/// Answers through the retrieval chain, feeding it the latest turns
pub struct RetrievalResolver {
    chain: RetrievalChain,
    max_history_turns: usize,
    live_stream: bool,
}

impl RetrievalResolver {
    pub fn new(chain: RetrievalChain, max_history_turns: usize, live_stream: bool) -> Self {
        Self {
            chain,
            max_history_turns,
            live_stream,
        }
    }

    pub fn chain(&self) -> &RetrievalChain {
        &self.chain
    }
}

#[async_trait]
impl AnswerResolver for RetrievalResolver {
    async fn resolve(&self, question: &str, turns: &ChatTurnHistory) -> Result<Resolution> {
        let output = self
            .chain
            .invoke(question, turns.window(self.max_history_turns))
            .await?;

        for source in &output.source_chunks {
            tracing::debug!(
                "Source {} ({:.3})",
                source.chunk.source.format_reference(),
                source.similarity
            );
        }

        Ok(Resolution::Found(Answer {
            text: output.answer,
            sources: output.source_chunks,
        }))
    }

    async fn resolve_live(&self, question: &str, turns: &ChatTurnHistory) -> Result<Option<LiveAnswer>> {
        if !self.live_stream {
            return Ok(None);
        }

        let (tokens, sources) = self
            .chain
            .stream(question, turns.window(self.max_history_turns))
            .await?;
        Ok(Some(LiveAnswer { tokens, sources }))
    }

    fn name(&self) -> &str {
        "retrieval"
    }
}
