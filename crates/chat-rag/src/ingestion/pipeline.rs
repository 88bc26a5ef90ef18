//! Ingestion pipeline orchestration

use std::path::Path;
use walkdir::WalkDir;

use crate::config::{ChunkingConfig, UnsupportedPolicy};
use crate::error::{Error, Result};
use crate::types::{Chunk, Document, FileType};

use super::chunker::TextChunker;
use super::parser::{FileParser, ParsedDocument};

/// A file left out of ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// File name inside the documents folder
    pub filename: String,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of ingesting a folder
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents in directory order
    pub documents: Vec<Document>,
    /// All chunks, grouped by document in the same order
    pub chunks: Vec<Chunk>,
    /// Files that had no loader
    pub skipped: Vec<SkippedFile>,
}

/// Main ingestion pipeline
pub struct IngestPipeline {
    /// Text chunker
    chunker: TextChunker,
    /// Handling of files without a loader
    on_unsupported: UnsupportedPolicy,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunking: &ChunkingConfig, on_unsupported: UnsupportedPolicy) -> Result<Self> {
        Ok(Self {
            chunker: TextChunker::new(chunking.chunk_size, chunking.chunk_overlap)?,
            on_unsupported,
        })
    }

    /// Parse a file
    pub fn parse_file(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        FileParser::parse(filename, data)
    }

    /// Full ingestion of one file: parse + chunk
    pub fn ingest(&self, filename: &str, data: &[u8]) -> Result<(Document, Vec<Chunk>)> {
        let parsed = self.parse_file(filename, data)?;

        let mut doc = Document::new(
            filename.to_string(),
            parsed.file_type.clone(),
            parsed.content_hash.clone(),
            data.len() as u64,
        );
        doc.total_pages = parsed.total_pages;

        let chunks = self.chunker.chunk_document(&doc, &parsed);
        doc.total_chunks = chunks.len() as u32;

        Ok((doc, chunks))
    }

    /// Ingest every supported file directly inside `dir`, in file-name order
    pub fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Documents folder not found: {}",
                dir.display()
            )));
        }

        tracing::info!("Scanning documents folder: {}", dir.display());

        let mut report = IngestReport::default();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().to_string();
            let file_type = FileType::from_path(path);

            if !file_type.is_supported() {
                self.skip(&mut report, filename, &file_type)?;
                continue;
            }

            let data = std::fs::read(path)?;
            let (doc, chunks) = self.ingest(&filename, &data)?;

            tracing::info!(
                "Loaded '{}' ({}): {} chunks",
                doc.filename,
                doc.file_type.display_name(),
                chunks.len()
            );

            report.chunks.extend(chunks);
            report.documents.push(doc);
        }

        tracing::info!(
            "Ingested {} documents into {} chunks ({} skipped)",
            report.documents.len(),
            report.chunks.len(),
            report.skipped.len()
        );

        Ok(report)
    }

    fn skip(&self, report: &mut IngestReport, filename: String, file_type: &FileType) -> Result<()> {
        let reason = format!("no loader for {}", file_type.display_name());

        match self.on_unsupported {
            UnsupportedPolicy::Error => {
                return Err(Error::UnsupportedFileType(format!("{} ({})", filename, reason)));
            }
            UnsupportedPolicy::Warn => tracing::warn!("Skipping '{}': {}", filename, reason),
            UnsupportedPolicy::Skip => tracing::debug!("Skipping '{}': {}", filename, reason),
        }

        report.skipped.push(SkippedFile { filename, reason });
        Ok(())
    }
}
