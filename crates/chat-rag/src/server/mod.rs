//! HTTP server for the chat assistant

pub mod routes;
pub mod state;

use axum::{response::Html, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::chat::{ChatController, StreamPresenter};
use crate::config::{RagConfig, ResolverMode};
use crate::error::{Error, Result};
use crate::generation::RetrievalChain;
use crate::knowledge::KnowledgeBase;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaClient, VectorStoreProvider};
use crate::resolver::{AnswerResolver, LookupResolver, QnaTable, RetrievalResolver};
use crate::types::Document;
use state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Chat HTTP/WebSocket server
pub struct ChatServer {
    config: RagConfig,
    state: AppState,
}

impl ChatServer {
    /// Build the resolver for the configured mode, ingesting documents when needed.
    ///
    /// Ingestion finishes before this returns, so no connection is accepted
    /// against a half-built knowledge base.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing chat server ({} mode)...", config.chat.mode);

        let (resolver, documents) = build_resolver(&config).await?;
        let controller = ChatController::new(
            resolver,
            StreamPresenter::new(config.chat.stream_delay()),
            config.chat.fallback_answer.clone(),
        );

        Ok(Self::with_controller(config, controller, documents))
    }

    /// Create a server around an existing controller
    pub fn with_controller(config: RagConfig, controller: ChatController, documents: Vec<Document>) -> Self {
        let state = AppState::new(config.clone(), controller, documents);
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/", get(index))
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Bind the configured address and serve until Ctrl+C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        tracing::info!("Starting chat server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// `/ready` reports 200 while connections are accepted and 503 once
    /// shutdown has begun and in-flight requests are draining.
    pub async fn serve<F>(self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let draining = self.state.clone();

        self.state.set_ready(true);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                draining.set_ready(false);
                tracing::info!("Shutting down, draining open requests");
            })
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

async fn build_resolver(config: &RagConfig) -> Result<(Arc<dyn AnswerResolver>, Vec<Document>)> {
    match config.chat.mode {
        ResolverMode::Lookup => {
            let table = match &config.chat.qna_path {
                Some(path) => QnaTable::load(path)?,
                None => {
                    tracing::info!("No Q&A file configured, using the built-in table");
                    QnaTable::builtin()
                }
            };
            Ok((Arc::new(LookupResolver::new(table)), Vec::new()))
        }
        ResolverMode::Retrieval => {
            let ollama = Arc::new(OllamaClient::new(&config.llm)?);

            if LlmProvider::health_check(ollama.as_ref()).await? {
                tracing::info!("Ollama reachable at {}", config.llm.base_url);
            } else {
                tracing::warn!(
                    "Ollama not reachable at {}; ingestion and answers will fail until it is up",
                    config.llm.base_url
                );
            }

            let knowledge = KnowledgeBase::build(config, ollama.as_ref()).await?;
            let store: Arc<dyn VectorStoreProvider> = knowledge.store();
            let embedder: Arc<dyn EmbeddingProvider> = ollama.clone();
            let llm: Arc<dyn LlmProvider> = ollama;

            let chain = RetrievalChain::new(
                embedder,
                store,
                llm,
                config.chat.instructions.clone(),
                config.knowledge_store.top_k,
            );
            let resolver = RetrievalResolver::new(
                chain,
                config.chat.max_history_turns,
                config.llm.live_stream,
            );

            Ok((Arc::new(resolver), knowledge.documents().to_vec()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Chat page
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn lookup_server() -> ChatServer {
        let mut config = RagConfig::default();
        config.chat.mode = ResolverMode::Lookup;
        config.chat.fallback_answer = "Không biết".to_string();

        let table = QnaTable::from_pairs([("hello", "Hi there"), ("bye", "Goodbye")]).unwrap();
        let controller = ChatController::new(
            Arc::new(LookupResolver::new(table)),
            StreamPresenter::new(Duration::ZERO),
            config.chat.fallback_answer.clone(),
        );
        ChatServer::with_controller(config, controller, Vec::new())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ask(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let router = lookup_server().build_router();

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("Simple chat"));
        assert!(page.contains("What is up?"));
    }

    #[tokio::test]
    async fn test_ask_found_and_fallback() {
        let router = lookup_server().build_router();

        let response = router.clone().oneshot(ask("hello, how are you")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "Hi there");
        assert_eq!(body["found"], true);
        assert_eq!(body["sources"].as_array().unwrap().len(), 0);

        let response = router.oneshot(ask("good morning")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["answer"], "Không biết");
        assert_eq!(body["found"], false);
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_question() {
        let router = lookup_server().build_router();
        let response = router.oneshot(ask("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "empty_prompt");
    }

    #[tokio::test]
    async fn test_info_and_documents() {
        let server = lookup_server();
        server.state().register_session(uuid::Uuid::new_v4());
        let router = server.build_router();

        let response = router
            .clone()
            .oneshot(Request::get("/api/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["mode"], "lookup");
        assert_eq!(body["resolver"], "lookup");
        assert_eq!(body["active_sessions"], 1);

        let response = router
            .oneshot(Request::get("/api/documents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["total_count"], 0);
    }

    #[tokio::test]
    async fn test_ready_tracks_serving_lifecycle() {
        let server = lookup_server();
        let state = server.state().clone();
        assert!(!state.is_ready());

        let response = server
            .build_router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve(listener, async move {
            let _ = stopped.await;
        }));

        let status = reqwest::get(format!("http://{}/ready", addr)).await.unwrap().status();
        assert_eq!(status, reqwest::StatusCode::OK);

        stop.send(()).unwrap();
        serving.await.unwrap().unwrap();
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_lookup_mode_bootstrap_uses_builtin_table() {
        let mut config = RagConfig::default();
        config.chat.mode = ResolverMode::Lookup;
        let server = ChatServer::new(config).await.unwrap();
        assert_eq!(server.state().controller().resolver().name(), "lookup");
        assert!(server.state().list_documents().is_empty());
    }
}
