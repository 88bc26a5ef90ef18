//! Conversational retrieval chain
//!
//! condense (only with history) -> embed -> top-k search -> answer prompt -> LLM

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{
    EmbeddingProvider, LlmProvider, TokenStream, VectorSearchResult, VectorStoreProvider,
};

use super::prompt::PromptBuilder;

/// Answer plus the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub answer: String,
    pub source_chunks: Vec<VectorSearchResult>,
}

/// Combines retrieved chunks, chat history and the instruction template into one answer
pub struct RetrievalChain {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    instructions: String,
    top_k: usize,
}

impl RetrievalChain {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
        instructions: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            instructions: instructions.into(),
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run the chain and return the complete answer
    pub async fn invoke(&self, question: &str, history: &[(String, String)]) -> Result<ChainOutput> {
        let (prompt, sources) = self.prepare(question, history).await?;
        let answer = self.llm.generate(&prompt).await?;

        Ok(ChainOutput {
            answer: answer.trim().to_string(),
            source_chunks: sources,
        })
    }

    /// Run the chain, streaming the answer as the model writes it
    pub async fn stream(
        &self,
        question: &str,
        history: &[(String, String)],
    ) -> Result<(TokenStream, Vec<VectorSearchResult>)> {
        let (prompt, sources) = self.prepare(question, history).await?;
        let tokens = self.llm.generate_stream(&prompt).await?;
        Ok((tokens, sources))
    }

    async fn prepare(
        &self,
        question: &str,
        history: &[(String, String)],
    ) -> Result<(String, Vec<VectorSearchResult>)> {
        let standalone = self.standalone_question(question, history).await?;

        let query_embedding = self.embedder.embed(&standalone).await?;
        let sources = self.store.search(&query_embedding, self.top_k).await?;

        tracing::debug!(
            "Retrieved {} chunks for \"{}\" (best similarity {:.3})",
            sources.len(),
            standalone,
            sources.first().map(|r| r.similarity).unwrap_or(0.0)
        );

        let context = PromptBuilder::build_context(&sources);
        let prompt = PromptBuilder::build_answer_prompt(&self.instructions, &context, &standalone);
        Ok((prompt, sources))
    }

    async fn standalone_question(&self, question: &str, history: &[(String, String)]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = PromptBuilder::build_condense_prompt(history, question);
        let condensed = self.llm.generate(&prompt).await?;
        let condensed = condensed.trim();

        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            tracing::debug!("Condensed \"{}\" into \"{}\"", question, condensed);
            Ok(condensed.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::LocalVectorStore;
    use crate::retrieval::VectorIndex;
    use crate::types::{Chunk, ChunkSource, FileType};
    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use uuid::Uuid;

    /// Embeds by keyword: "color" texts on axis 0, "size" texts on axis 1
    pub(crate) struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let color = if text.contains("color") { 1.0 } else { 0.0 };
            let size = if text.contains("size") { 1.0 } else { 0.0 };
            Ok(vec![color, size, 0.1])
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    /// Returns queued replies and records every prompt it receives
    pub(crate) struct ScriptedLlm {
        pub replies: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl ScriptedLlm {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }

        fn next_reply(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            if self.fail {
                return Err(Error::llm("model timeout"));
            }
            Ok(self.replies.lock().pop().unwrap_or_default())
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.next_reply(prompt)
        }

        async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
            let reply = self.next_reply(prompt)?;
            let pieces: Vec<Result<String>> = reply
                .split_inclusive(' ')
                .map(|piece| Ok(piece.to_string()))
                .collect();
            Ok(Box::pin(futures::stream::iter(pieces)))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.fail)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }

    pub(crate) async fn shop_store() -> Arc<LocalVectorStore> {
        let store = LocalVectorStore::new(Arc::new(VectorIndex::in_memory()));
        let doc_id = Uuid::new_v4();
        let mut chunks = Vec::new();
        for (i, text) in ["shirts come in color white and black", "size chart: S M L XL"]
            .iter()
            .enumerate()
        {
            let source = ChunkSource {
                filename: "shop.txt".to_string(),
                file_type: FileType::Txt,
                page_count: None,
            };
            let mut chunk = Chunk::new(doc_id, text.to_string(), source, 0, text.len(), i as u32);
            chunk.embedding = KeywordEmbedder.embed(text).await.unwrap();
            chunks.push(chunk);
        }
        store.insert_chunks(chunks).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_first_turn_skips_condense() {
        let llm = Arc::new(ScriptedLlm::new(&["We have S to XL."]));
        let chain = RetrievalChain::new(
            Arc::new(KeywordEmbedder),
            shop_store().await,
            llm.clone(),
            "Be brief.",
            1,
        );

        let output = chain.invoke("which size fits me?", &[]).await.unwrap();
        assert_eq!(output.answer, "We have S to XL.");
        assert_eq!(output.source_chunks.len(), 1);
        assert_eq!(output.source_chunks[0].chunk.content, "size chart: S M L XL");

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Be brief.\nsize chart: S M L XL"));
        assert!(prompts[0].contains("Question: which size fits me?"));
    }

    #[tokio::test]
    async fn test_follow_up_is_condensed_before_retrieval() {
        let llm = Arc::new(ScriptedLlm::new(&["what color are the shirts?", "White and black."]));
        let chain = RetrievalChain::new(
            Arc::new(KeywordEmbedder),
            shop_store().await,
            llm.clone(),
            "Be brief.",
            1,
        );

        let history = vec![("hi".to_string(), "Hello! Which color and size?".to_string())];
        let output = chain.invoke("and the colors?", &history).await.unwrap();

        assert_eq!(output.answer, "White and black.");
        assert_eq!(output.source_chunks[0].chunk.content, "shirts come in color white and black");

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Human: hi\nAssistant: Hello! Which color and size?"));
        assert!(prompts[1].contains("Question: what color are the shirts?"));
    }

    #[tokio::test]
    async fn test_stream_yields_model_pieces() {
        let llm = Arc::new(ScriptedLlm::new(&["Xin chào bạn"]));
        let chain = RetrievalChain::new(Arc::new(KeywordEmbedder), shop_store().await, llm, "", 6);

        let (tokens, sources) = chain.stream("color?", &[]).await.unwrap();
        let pieces: Vec<String> = tokens.map(|t| t.unwrap()).collect().await;
        assert_eq!(pieces, vec!["Xin ", "chào ", "bạn"]);
        assert_eq!(sources.len(), 2);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let chain = RetrievalChain::new(
            Arc::new(KeywordEmbedder),
            shop_store().await,
            Arc::new(ScriptedLlm::failing()),
            "",
            6,
        );
        let err = chain.invoke("size?", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}
