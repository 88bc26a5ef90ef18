//! Per-session message log and question/answer turns

use serde::Serialize;

use crate::types::ChatMessage;

/// Append-only log of everything shown in the chat window
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionHistory {
    messages: Vec<ChatMessage>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Messages in conversational order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Completed `(question, answer)` pairs fed back to the retrieval chain
#[derive(Debug, Clone, Default)]
pub struct ChatTurnHistory {
    turns: Vec<(String, String)>,
}

impl ChatTurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push((question.into(), answer.into()));
    }

    pub fn turns(&self) -> &[(String, String)] {
        &self.turns
    }

    /// The most recent `max_turns` turns, oldest first
    pub fn window(&self, max_turns: usize) -> &[(String, String)] {
        let start = self.turns.len().saturating_sub(max_turns);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_latest_turns() {
        let mut turns = ChatTurnHistory::new();
        for i in 0..7 {
            turns.push(format!("q{}", i), format!("a{}", i));
        }

        let window = turns.window(5);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].0, "q2");
        assert_eq!(window[4].1, "a6");
        assert_eq!(turns.len(), 7);

        assert!(turns.window(0).is_empty());
        assert_eq!(turns.window(100).len(), 7);
    }

    #[test]
    fn test_history_keeps_order() {
        let mut history = SessionHistory::new();
        history.push(ChatMessage::user("áo trắng"));
        history.push(ChatMessage::assistant("Bạn mặc cỡ nào?"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].content(), "áo trắng");
        assert_eq!(history.messages()[1].content(), "Bạn mặc cỡ nào?");
    }
}
