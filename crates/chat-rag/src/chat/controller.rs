//! Drives one prompt/answer cycle of a chat session

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::VectorSearchResult;
use crate::resolver::{AnswerResolver, LiveAnswer, Resolution};

use super::session::ChatSession;
use super::stream::StreamPresenter;

/// Receives answer tokens as they are produced
#[async_trait]
pub trait TokenSink: Send {
    async fn send_token(&mut self, index: usize, token: &str) -> Result<()>;
}

#[async_trait]
impl TokenSink for Vec<String> {
    async fn send_token(&mut self, _index: usize, token: &str) -> Result<()> {
        self.push(token.to_string());
        Ok(())
    }
}

/// Result of a completed cycle
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Answer as recorded in the session history
    pub answer: String,
    /// False when the fallback answer was used
    pub found: bool,
    pub sources: Vec<VectorSearchResult>,
    pub token_count: usize,
}

pub struct ChatController {
    resolver: Arc<dyn AnswerResolver>,
    presenter: StreamPresenter,
    fallback_answer: String,
}

impl ChatController {
    pub fn new(
        resolver: Arc<dyn AnswerResolver>,
        presenter: StreamPresenter,
        fallback_answer: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            presenter,
            fallback_answer: fallback_answer.into(),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn AnswerResolver> {
        &self.resolver
    }

    /// Submit `prompt`, stream the answer into `sink` and record it.
    ///
    /// On failure the session is returned to idle and nothing is recorded for
    /// the assistant.
    pub async fn run_turn<S>(&self, session: &mut ChatSession, prompt: &str, sink: &mut S) -> Result<TurnOutcome>
    where
        S: TokenSink + ?Sized,
    {
        let question = session.submit(prompt)?;

        match self.respond(session, &question, sink).await {
            Ok(outcome) => {
                session.complete(outcome.answer.clone())?;
                Ok(outcome)
            }
            Err(e) => {
                session.abort();
                Err(e)
            }
        }
    }

    async fn respond<S>(&self, session: &ChatSession, question: &str, sink: &mut S) -> Result<TurnOutcome>
    where
        S: TokenSink + ?Sized,
    {
        if let Some(live) = self.resolver.resolve_live(question, session.turns()).await? {
            return forward_live(live, sink).await;
        }

        let (text, found, sources) = match self.resolver.resolve(question, session.turns()).await? {
            Resolution::Found(answer) => (answer.text, true, answer.sources),
            Resolution::NotFound => (self.fallback_answer.clone(), false, Vec::new()),
        };

        let mut tokens = self.presenter.present(&text);
        let mut answer = String::new();
        let mut index = 0;
        while let Some(token) = tokens.next().await {
            sink.send_token(index, &token).await?;
            answer.push_str(&token);
            index += 1;
        }

        Ok(TurnOutcome {
            answer: answer.trim_end().to_string(),
            found,
            sources,
            token_count: index,
        })
    }
}

async fn forward_live<S>(live: LiveAnswer, sink: &mut S) -> Result<TurnOutcome>
where
    S: TokenSink + ?Sized,
{
    let LiveAnswer { mut tokens, sources } = live;
    let mut answer = String::new();
    let mut index = 0;

    while let Some(piece) = tokens.next().await {
        let piece = piece?;
        if piece.is_empty() {
            continue;
        }
        sink.send_token(index, &piece).await?;
        answer.push_str(&piece);
        index += 1;
    }

    Ok(TurnOutcome {
        answer: answer.trim().to_string(),
        found: true,
        sources,
        token_count: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::generation::tests::{shop_store, KeywordEmbedder, ScriptedLlm};
    use crate::generation::RetrievalChain;
    use crate::resolver::{LookupResolver, QnaTable, RetrievalResolver};
    use crate::types::Role;
    use std::time::Duration;

    fn lookup_controller() -> ChatController {
        let table = QnaTable::from_pairs([("hello", "Hi there"), ("bye", "Goodbye")]).unwrap();
        ChatController::new(
            Arc::new(LookupResolver::new(table)),
            StreamPresenter::new(Duration::ZERO),
            "I don't know",
        )
    }

    /// Accepts `limit` tokens, then fails like a closed socket
    struct ClosingSink {
        limit: usize,
        sent: Vec<String>,
    }

    #[async_trait]
    impl TokenSink for ClosingSink {
        async fn send_token(&mut self, _index: usize, token: &str) -> Result<()> {
            if self.sent.len() == self.limit {
                return Err(Error::internal("connection closed"));
            }
            self.sent.push(token.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lookup_end_to_end() {
        let controller = lookup_controller();
        let mut session = ChatSession::new();
        let mut tokens: Vec<String> = Vec::new();

        let outcome = controller
            .run_turn(&mut session, "hello, how are you", &mut tokens)
            .await
            .unwrap();

        assert_eq!(tokens, vec!["Hi ", "there "]);
        assert_eq!(outcome.answer, "Hi there");
        assert!(outcome.found);
        assert_eq!(outcome.token_count, 2);

        let messages = session.history().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content(), "hello, how are you");
        assert_eq!(messages[1].role(), Role::Assistant);
        assert_eq!(messages[1].content(), "Hi there");
    }

    #[tokio::test]
    async fn test_miss_uses_fallback() {
        let controller = lookup_controller();
        let mut session = ChatSession::new();
        let mut tokens: Vec<String> = Vec::new();

        let outcome = controller.run_turn(&mut session, "good morning", &mut tokens).await.unwrap();
        assert!(!outcome.found);
        assert_eq!(outcome.answer, "I don't know");
        assert_eq!(tokens, vec!["I ", "don't ", "know "]);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_many_cycles_alternate() {
        let controller = lookup_controller();
        let mut session = ChatSession::new();

        for prompt in ["hello", "bye", "what?", "hello again"] {
            let mut tokens: Vec<String> = Vec::new();
            controller.run_turn(&mut session, prompt, &mut tokens).await.unwrap();
        }

        assert_eq!(session.history().len(), 8);
        assert!(session.is_well_formed());
        assert_eq!(session.turns().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_prompt_leaves_history_untouched() {
        let controller = lookup_controller();
        let mut session = ChatSession::new();
        let mut tokens: Vec<String> = Vec::new();

        let err = controller.run_turn(&mut session, "   ", &mut tokens).await.unwrap_err();
        assert!(matches!(err, Error::EmptyPrompt));
        assert!(session.history().is_empty());
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_without_partial_answer() {
        let controller = lookup_controller();
        let mut session = ChatSession::new();
        let mut sink = ClosingSink { limit: 1, sent: Vec::new() };

        assert!(controller.run_turn(&mut session, "hello", &mut sink).await.is_err());
        assert_eq!(sink.sent, vec!["Hi "]);
        assert_eq!(session.history().len(), 1);
        assert!(session.turns().is_empty());

        let mut tokens: Vec<String> = Vec::new();
        controller.run_turn(&mut session, "bye", &mut tokens).await.unwrap();
        assert_eq!(session.history().len(), 3);
    }

    #[tokio::test]
    async fn test_resolver_error_aborts() {
        let chain = RetrievalChain::new(
            Arc::new(KeywordEmbedder),
            shop_store().await,
            Arc::new(ScriptedLlm::failing()),
            "",
            6,
        );
        let controller = ChatController::new(
            Arc::new(RetrievalResolver::new(chain, 5, false)),
            StreamPresenter::new(Duration::ZERO),
            "I don't know",
        );
        let mut session = ChatSession::new();
        let mut tokens: Vec<String> = Vec::new();

        let err = controller.run_turn(&mut session, "size?", &mut tokens).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert_eq!(session.history().len(), 1);
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_turns_feed_next_question() {
        let llm = Arc::new(ScriptedLlm::new(&[
            "Bạn muốn màu gì?",
            "what color are the shirts?",
            "Trắng và đen.",
        ]));
        let chain = RetrievalChain::new(Arc::new(KeywordEmbedder), shop_store().await, llm.clone(), "", 6);
        let controller = ChatController::new(
            Arc::new(RetrievalResolver::new(chain, 5, false)),
            StreamPresenter::new(Duration::ZERO),
            "I don't know",
        );
        let mut session = ChatSession::new();

        let mut tokens: Vec<String> = Vec::new();
        controller.run_turn(&mut session, "xin chào", &mut tokens).await.unwrap();
        assert_eq!(session.turns().len(), 1);

        let mut tokens: Vec<String> = Vec::new();
        let outcome = controller.run_turn(&mut session, "còn màu?", &mut tokens).await.unwrap();
        assert_eq!(outcome.answer, "Trắng và đen.");
        assert_eq!(outcome.sources[0].chunk.content, "shirts come in color white and black");

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("Human: xin chào\nAssistant: Bạn muốn màu gì?"));
    }

    #[tokio::test]
    async fn test_live_answer_is_forwarded_as_is() {
        let llm = Arc::new(ScriptedLlm::new(&["Cỡ M còn hàng. "]));
        let chain = RetrievalChain::new(Arc::new(KeywordEmbedder), shop_store().await, llm, "", 6);
        let controller = ChatController::new(
            Arc::new(RetrievalResolver::new(chain, 5, true)),
            StreamPresenter::new(Duration::from_secs(60)),
            "I don't know",
        );
        let mut session = ChatSession::new();
        let mut tokens: Vec<String> = Vec::new();

        let outcome = controller.run_turn(&mut session, "size M?", &mut tokens).await.unwrap();
        assert_eq!(tokens, vec!["Cỡ ", "M ", "còn ", "hàng. "]);
        assert_eq!(outcome.answer, "Cỡ M còn hàng.");
        assert_eq!(session.history().messages()[1].content(), "Cỡ M còn hàng.");
    }
}
