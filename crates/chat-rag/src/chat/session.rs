//! Chat session state machine
//!
//! `Idle --submit--> Responding --complete/abort--> Idle`

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChatMessage, Role};

use super::history::{ChatTurnHistory, SessionHistory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Responding,
}

/// One conversation, owned by the connection that serves it
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    history: SessionHistory,
    turns: ChatTurnHistory,
    state: SessionState,
    /// Question being answered while `Responding`
    pending: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: SessionHistory::new(),
            turns: ChatTurnHistory::new(),
            state: SessionState::Idle,
            pending: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn turns(&self) -> &ChatTurnHistory {
        &self.turns
    }

    /// Record the user's prompt and start responding.
    ///
    /// Returns the trimmed question.
    pub fn submit(&mut self, prompt: &str) -> Result<String> {
        let question = prompt.trim();
        if question.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        if self.state == SessionState::Responding {
            return Err(Error::SessionBusy);
        }

        self.history.push(ChatMessage::user(question));
        self.pending = Some(question.to_string());
        self.state = SessionState::Responding;
        Ok(question.to_string())
    }

    /// Record the full answer and return to idle
    pub fn complete(&mut self, answer: impl Into<String>) -> Result<()> {
        let question = match (self.state, self.pending.take()) {
            (SessionState::Responding, Some(question)) => question,
            _ => return Err(Error::internal("No prompt is awaiting an answer")),
        };

        let answer = answer.into();
        self.history.push(ChatMessage::assistant(answer.clone()));
        self.turns.push(question, answer);
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Drop the in-flight answer; the user message stays in the history
    pub fn abort(&mut self) {
        self.pending = None;
        self.state = SessionState::Idle;
    }

    /// Whether every message so far alternates user/assistant, starting with the user
    pub fn is_well_formed(&self) -> bool {
        self.history
            .messages()
            .chunks(2)
            .all(|pair| match pair {
                [user, assistant] => user.role() == Role::User && assistant.role() == Role::Assistant,
                [user] => user.role() == Role::User,
                _ => false,
            })
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
