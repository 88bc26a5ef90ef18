//! WebSocket chat sessions
//!
//! One task per connection owns its `ChatSession`; frames are handled in order,
//! so a session never has two answers in flight.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};

use crate::chat::{ChatSession, TokenSink};
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::protocol::{ClientMessage, ServerMessage};

/// GET /api/ws - Upgrade to a chat session
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forwards answer tokens as `chat_chunk` frames
struct WsSink<'a> {
    socket: &'a mut WebSocket,
    request_id: &'a str,
}

#[async_trait]
impl<'a> TokenSink for WsSink<'a> {
    async fn send_token(&mut self, index: usize, token: &str) -> Result<()> {
        send_frame(
            &mut *self.socket,
            &ServerMessage::ChatChunk {
                request_id: self.request_id.to_string(),
                content: token.to_string(),
                index,
            },
        )
        .await
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut session = ChatSession::new();
    let session_id = session.id();
    state.register_session(session_id);
    tracing::info!("Session {} connected ({} mode)", session_id, state.mode());

    let connected = ServerMessage::Connected {
        session_id,
        mode: state.mode().to_string(),
    };
    if send_frame(&mut socket, &connected).await.is_ok() {
        serve_session(&mut socket, &state, &mut session).await;
    }

    state.unregister_session(&session_id);
    tracing::info!(
        "Session {} closed after {} messages",
        session_id,
        session.history().len()
    );
}

async fn serve_session(socket: &mut WebSocket, state: &AppState, session: &mut ChatSession) {
    let mut request_counter: u64 = 0;

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Session {} receive error: {}", session.id(), e);
                break;
            }
        };

        let frame = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(frame) => frame,
            Err(e) => {
                let error = ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                };
                if send_frame(socket, &error).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let sent = match frame {
            ClientMessage::Chat { content } => {
                request_counter += 1;
                let request_id = format!("req_{}", request_counter);
                run_chat(socket, state, session, &request_id, &content).await
            }
            ClientMessage::History => {
                let history = ServerMessage::History {
                    messages: session.history().messages().to_vec(),
                };
                send_frame(socket, &history).await
            }
            ClientMessage::Ping => send_frame(socket, &ServerMessage::Pong).await,
        };

        if sent.is_err() {
            break;
        }
    }
}

/// Run one chat turn; returns an error only when the socket is gone
async fn run_chat(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut ChatSession,
    request_id: &str,
    content: &str,
) -> Result<()> {
    send_frame(
        socket,
        &ServerMessage::ChatStart {
            request_id: request_id.to_string(),
        },
    )
    .await?;

    let result = {
        let mut sink = WsSink {
            socket: &mut *socket,
            request_id,
        };
        state.controller().run_turn(session, content, &mut sink).await
    };

    match result {
        Ok(outcome) => {
            tracing::info!(
                "Session {} {}: {} tokens (found: {})",
                session.id(),
                request_id,
                outcome.token_count,
                outcome.found
            );
            send_frame(
                socket,
                &ServerMessage::ChatDone {
                    request_id: request_id.to_string(),
                    content: outcome.answer,
                },
            )
            .await
        }
        Err(e) => {
            tracing::error!("Session {} {} failed: {}", session.id(), request_id, e);
            send_frame(
                socket,
                &ServerMessage::ChatError {
                    request_id: request_id.to_string(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                },
            )
            .await
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerMessage) -> Result<()> {
    let text = serde_json::to_string(frame)?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| Error::internal(format!("WebSocket send failed: {}", e)))
}
