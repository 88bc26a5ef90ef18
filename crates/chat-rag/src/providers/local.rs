//! Local vector store backed by the JSON-persisted `VectorIndex`

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retrieval::VectorIndex;
use crate::types::Chunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Local vector store wrapping a brute-force cosine index
pub struct LocalVectorStore {
    index: Arc<VectorIndex>,
}

impl LocalVectorStore {
    /// Create from an existing index
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self { index }
    }

    /// Open (or start) the index file at `path`
    pub fn open(path: PathBuf) -> Result<Self> {
        Ok(Self::new(Arc::new(VectorIndex::open(path)?)))
    }

    /// Start an empty index at `path`, ignoring any file already there
    pub fn create(path: PathBuf) -> Self {
        Self::new(Arc::new(VectorIndex::create(path)))
    }

    /// Get underlying index for direct access
    pub fn inner(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in chunks {
            self.index.insert(chunk)?;
        }
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let index = self.index.clone();
        let query = query_embedding.to_vec();

        tokio::task::spawn_blocking(move || {
            index
                .search(&query, top_k)
                .into_iter()
                .map(|r| VectorSearchResult {
                    chunk: r.chunk,
                    similarity: r.similarity,
                })
                .collect()
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))
    }

    async fn clear(&self) -> Result<()> {
        self.index.clear();
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let index = self.index.clone();
        tokio::task::spawn_blocking(move || index.persist())
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.len())
    }

    fn name(&self) -> &str {
        "local-json"
    }
}
