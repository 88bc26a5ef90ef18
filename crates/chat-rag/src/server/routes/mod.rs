//! API routes for the chat server

pub mod ws;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::time::Instant;

use crate::chat::ChatTurnHistory;
use crate::error::{Error, Result};
use crate::resolver::Resolution;
use crate::server::state::AppState;
use crate::types::response::{AskRequest, AskResponse, DocumentListResponse, DocumentSummary, SourceRef};

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ask", post(ask))
        .route("/documents", get(list_documents))
        .route("/ws", get(ws::ws_handler))
        .route("/info", get(info))
}

/// POST /api/ask - Answer a single question without a session
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    let question = request.question.trim();
    if question.is_empty() {
        return Err(Error::EmptyPrompt);
    }

    tracing::info!("Ask: \"{}\"", question);

    let resolver = state.controller().resolver();
    let resolution = resolver.resolve(question, &ChatTurnHistory::new()).await?;

    let (answer, found, sources) = match resolution {
        Resolution::Found(answer) => (
            answer.text,
            true,
            answer
                .sources
                .iter()
                .map(|r| SourceRef::from_chunk(&r.chunk, r.similarity))
                .collect(),
        ),
        Resolution::NotFound => (state.config().chat.fallback_answer.clone(), false, Vec::new()),
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!("Answered in {}ms (found: {})", processing_time_ms, found);

    Ok(Json(AskResponse {
        answer,
        found,
        sources,
        processing_time_ms,
    }))
}

/// GET /api/documents - List ingested documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents: Vec<DocumentSummary> = state
        .list_documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();

    let total_count = documents.len();
    Json(DocumentListResponse {
        documents,
        total_count,
    })
}

/// GET /api/info
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.mode().to_string(),
        "resolver": state.controller().resolver().name(),
        "active_sessions": state.session_count(),
        "endpoints": {
            "GET /api/ws": "WebSocket chat session",
            "POST /api/ask": "Answer one question without history",
            "GET /api/documents": "List ingested documents"
        }
    }))
}
