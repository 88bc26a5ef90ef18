//! Application state for the chat server

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::chat::ChatController;
use crate::config::{RagConfig, ResolverMode};
use crate::types::Document;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    /// Turn controller shared by every session
    controller: ChatController,
    /// Document registry, filled once by ingestion
    documents: DashMap<Uuid, Document>,
    /// Open WebSocket sessions and when they connected
    sessions: DashMap<Uuid, DateTime<Utc>>,
    ready: RwLock<bool>,
}

impl AppState {
    pub fn new(config: RagConfig, controller: ChatController, documents: Vec<Document>) -> Self {
        let registry = DashMap::new();
        for doc in documents {
            registry.insert(doc.id, doc);
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                controller,
                documents: registry,
                sessions: DashMap::new(),
                ready: RwLock::new(false),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn mode(&self) -> ResolverMode {
        self.inner.config.chat.mode
    }

    pub fn controller(&self) -> &ChatController {
        &self.inner.controller
    }

    /// True while the server accepts connections
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Flipped on when serving starts and off when shutdown begins
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    /// List all documents by file name
    pub fn list_documents(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| a.filename.cmp(&b.filename));
        documents
    }

    pub fn register_session(&self, id: Uuid) {
        self.inner.sessions.insert(id, Utc::now());
    }

    pub fn unregister_session(&self, id: &Uuid) {
        self.inner.sessions.remove(id);
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}
