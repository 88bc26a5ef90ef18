//! Knowledge base: ingested documents plus their embedded chunks
//!
//! Built once at startup. With `rebuild_on_start = false` an existing index and
//! document manifest under `persist_dir` are reopened instead of re-embedding.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{IngestPipeline, IngestReport, SkippedFile};
use crate::providers::{EmbeddingProvider, LocalVectorStore, VectorStoreProvider};
use crate::types::{Chunk, Document};

const MANIFEST_FILE: &str = "documents.json";

pub struct KnowledgeBase {
    store: Arc<LocalVectorStore>,
    documents: Vec<Document>,
    skipped: Vec<SkippedFile>,
}

impl KnowledgeBase {
    /// Load or rebuild the knowledge base described by `config`
    pub async fn build(config: &RagConfig, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let index_path = config.knowledge_store.index_path();
        let manifest_path = config.knowledge_store.persist_dir.join(MANIFEST_FILE);

        if !config.knowledge_store.rebuild_on_start && index_path.exists() {
            let store = LocalVectorStore::open(index_path)?;
            let documents = read_manifest(&manifest_path)?;
            tracing::info!(
                "Reopened knowledge base: {} documents, {} chunks",
                documents.len(),
                store.len().await?
            );
            return Ok(Self {
                store: Arc::new(store),
                documents,
                skipped: Vec::new(),
            });
        }

        let report = ingest_documents(config).await?;

        let store = LocalVectorStore::create(index_path);

        let chunks = embed_chunks(embedder, report.chunks).await?;
        let chunk_count = chunks.len();
        store.insert_chunks(chunks).await?;
        store.persist().await?;
        write_manifest(&manifest_path, &report.documents)?;

        tracing::info!(
            "Built knowledge base: {} documents, {} chunks, {} skipped",
            report.documents.len(),
            chunk_count,
            report.skipped.len()
        );

        Ok(Self {
            store: Arc::new(store),
            documents: report.documents,
            skipped: report.skipped,
        })
    }

    pub fn store(&self) -> Arc<LocalVectorStore> {
        self.store.clone()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Files left out during the last rebuild
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

/// Parse and chunk the documents folder on the blocking pool
async fn ingest_documents(config: &RagConfig) -> Result<IngestReport> {
    let pipeline = IngestPipeline::new(&config.chunking, config.ingestion.on_unsupported)?;
    let docs_dir = config.ingestion.docs_dir.clone();

    tokio::task::spawn_blocking(move || pipeline.ingest_dir(&docs_dir))
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

async fn embed_chunks(embedder: &dyn EmbeddingProvider, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
    if chunks.is_empty() {
        tracing::warn!("No chunks to embed; answers will have no document context");
        return Ok(chunks);
    }

    tracing::info!("Embedding {} chunks with {}", chunks.len(), embedder.name());
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(Error::embedding(format!(
            "Expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }
    Ok(chunks)
}

fn read_manifest(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        tracing::warn!("No document manifest at {}", path.display());
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_manifest(path: &Path, documents: &[Document]) -> Result<()> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(documents)?)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::tests::KeywordEmbedder;

    fn config(root: &Path) -> RagConfig {
        let mut config = RagConfig::default();
        config.ingestion.docs_dir = root.join("docs");
        config.knowledge_store.persist_dir = root.join("data");
        config
    }

    #[tokio::test]
    async fn test_build_then_reopen() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/colors.txt"), "shirts come in color white").unwrap();
        std::fs::write(root.path().join("docs/sizes.txt"), "size chart S M L").unwrap();
        std::fs::write(root.path().join("docs/logo.png"), [0u8, 1, 2]).unwrap();

        let mut config = config(root.path());
        let kb = KnowledgeBase::build(&config, &KeywordEmbedder).await.unwrap();
        assert_eq!(kb.documents().len(), 2);
        assert_eq!(kb.skipped().len(), 1);
        assert_eq!(kb.store().len().await.unwrap(), 2);

        let hits = kb.store().search(&[0.0, 1.0, 0.1], 1).await.unwrap();
        assert_eq!(hits[0].chunk.content, "size chart S M L");

        config.knowledge_store.rebuild_on_start = false;
        std::fs::remove_file(root.path().join("docs/sizes.txt")).unwrap();
        let reopened = KnowledgeBase::build(&config, &KeywordEmbedder).await.unwrap();
        assert_eq!(reopened.documents().len(), 2);
        assert_eq!(reopened.store().len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_index() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/a.txt"), "color white").unwrap();

        let config = config(root.path());
        KnowledgeBase::build(&config, &KeywordEmbedder).await.unwrap();
        let rebuilt = KnowledgeBase::build(&config, &KeywordEmbedder).await.unwrap();
        assert_eq!(rebuilt.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_ignores_unreadable_previous_index() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/a.txt"), "color white").unwrap();
        std::fs::create_dir_all(root.path().join("data")).unwrap();

        let config = config(root.path());
        let index_path = config.knowledge_store.index_path();
        std::fs::write(&index_path, r#"{"version":2,"chunks":[]}"#).unwrap();

        let kb = KnowledgeBase::build(&config, &KeywordEmbedder).await.unwrap();
        assert_eq!(kb.store().len().await.unwrap(), 1);

        // the rewritten file is readable again
        let reopened = LocalVectorStore::open(index_path).unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);

        std::fs::write(config.knowledge_store.index_path(), "not json").unwrap();
        assert!(KnowledgeBase::build(&config, &KeywordEmbedder).await.is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_ingestion_leaves_runtime_free() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("docs")).unwrap();
        for i in 0..50 {
            std::fs::write(root.path().join(format!("docs/{i:02}.txt")), "color white ".repeat(400)).unwrap();
        }

        // a single-threaded runtime only runs this task if ingestion yields
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        let report = ingest_documents(&config(root.path())).await.unwrap();
        assert_eq!(report.documents.len(), 50);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_docs_folder_fails() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        assert!(KnowledgeBase::build(&config, &KeywordEmbedder).await.is_err());
    }
}
