//! Brute-force cosine index over embedded chunks, persisted as JSON

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Chunk;

const INDEX_VERSION: u32 = 1;

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0..=1.0, higher is better)
    pub similarity: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    chunks: Vec<Chunk>,
}

/// In-memory chunk index with optional on-disk persistence
pub struct VectorIndex {
    /// Index file, `None` for a purely in-memory index
    path: Option<PathBuf>,
    /// Embedded chunks in insertion order
    chunks: RwLock<Vec<Chunk>>,
}

impl VectorIndex {
    /// Create an index that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Start an empty index bound to `path` without reading what is there.
    ///
    /// The file is replaced on the next `persist`.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Open the index at `path`, loading it when the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let chunks = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let file: IndexFile = serde_json::from_str(&data)?;
            if file.version != INDEX_VERSION {
                return Err(Error::vector_db(format!(
                    "Unsupported index version {} in {}",
                    file.version,
                    path.display()
                )));
            }
            tracing::info!("Loaded {} chunks from {}", file.chunks.len(), path.display());
            file.chunks
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            chunks: RwLock::new(chunks),
        })
    }

    /// Index file location
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert an embedded chunk
    pub fn insert(&self, chunk: Chunk) -> Result<()> {
        if chunk.embedding.is_empty() {
            return Err(Error::vector_db("Chunk has no embedding"));
        }

        let mut chunks = self.chunks.write();
        if let Some(first) = chunks.first() {
            if first.embedding.len() != chunk.embedding.len() {
                return Err(Error::vector_db(format!(
                    "Embedding dimension mismatch: index has {}, chunk has {}",
                    first.embedding.len(),
                    chunk.embedding.len()
                )));
            }
        }
        chunks.push(chunk);
        Ok(())
    }

    /// Return the `top_k` most similar chunks, best first
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let chunks = self.chunks.read();

        let mut results: Vec<SearchResult> = chunks
            .iter()
            .map(|chunk| SearchResult {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        // stable sort keeps insertion order between equal scores
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }

    /// Remove every chunk
    pub fn clear(&self) {
        self.chunks.write().clear();
    }

    /// Get chunk count
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the index file; the previous file is replaced atomically
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let data = {
            let chunks = self.chunks.read();
            serde_json::to_vec(&IndexFile {
                version: INDEX_VERSION,
                chunks: chunks.clone(),
            })?
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Persisted {} chunks to {}", self.len(), path.display());
        Ok(())
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
