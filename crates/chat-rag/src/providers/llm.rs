//! LLM provider trait for prompt completion

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;

/// Incrementally delivered text; each item is the next piece of the answer
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM-based text generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt and return the full text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt, yielding text as the model produces it
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
