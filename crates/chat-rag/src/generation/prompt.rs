//! Prompt templates for retrieval answers

use crate::providers::VectorSearchResult;

/// Prompt builder for the retrieval chain
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts into the context block
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render previous turns as a transcript
    pub fn format_history(turns: &[(String, String)]) -> String {
        turns
            .iter()
            .map(|(question, answer)| format!("Human: {}\nAssistant: {}", question, answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Prompt asking the model to fold the conversation into one standalone question
    pub fn build_condense_prompt(turns: &[(String, String)], question: &str) -> String {
        format!(
            r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{history}
Follow Up Input: {question}
Standalone question:"#,
            history = Self::format_history(turns),
            question = question
        )
    }

    /// Answer prompt: fixed instructions, retrieved context, then the question
    pub fn build_answer_prompt(instructions: &str, context: &str, question: &str) -> String {
        format!(
            r#"{instructions}
{context}

Question: {question}
Helpful Answer:"#,
            instructions = instructions.trim(),
            context = context,
            question = question
        )
    }
}
