//! WebSocket chat protocol
//!
//! Client frames:
//! - `{"type":"chat","content":"..."}`
//! - `{"type":"history"}`
//! - `{"type":"ping"}`
//!
//! Server frames:
//! - `{"type":"connected","session_id":"...","mode":"lookup"}`
//! - `{"type":"chat_start","request_id":"req_1"}`
//! - `{"type":"chat_chunk","request_id":"req_1","content":"Hi ","index":0}`
//! - `{"type":"chat_done","request_id":"req_1","content":"Hi there"}`
//! - `{"type":"chat_error","request_id":"req_1","kind":"llm_error","message":"..."}`
//! - `{"type":"history","messages":[...]}`
//! - `{"type":"pong"}` / `{"type":"error","message":"..."}`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::ChatMessage;

/// Frame sent by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat { content: String },
    History,
    Ping,
}

/// Frame sent to the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        session_id: Uuid,
        mode: String,
    },
    ChatStart {
        request_id: String,
    },
    ChatChunk {
        request_id: String,
        content: String,
        index: usize,
    },
    ChatDone {
        request_id: String,
        content: String,
    },
    ChatError {
        request_id: String,
        kind: String,
        message: String,
    },
    History {
        messages: Vec<ChatMessage>,
    },
    Pong,
    Error {
        message: String,
    },
}
