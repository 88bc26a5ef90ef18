//! Document and chunk types produced by ingestion

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// File types the ingestion pipeline knows about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Legacy Word document (.doc), read with the DOCX loader
    Doc,
    /// Plain text file
    Txt,
    /// Anything else; carries the lowercased extension
    Unsupported(String),
}

impl FileType {
    /// Detect file type from extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "txt" => Self::Txt,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Detect file type from a path
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    /// Check if a loader exists for this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Doc => "Word Document (.doc)",
            Self::Txt => "Text File",
            Self::Unsupported(ext) if ext.is_empty() => "(no extension)",
            Self::Unsupported(ext) => ext.as_str(),
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// File name inside the documents folder
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Total number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document
    pub fn new(filename: String, file_type: FileType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// File name inside the documents folder
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Total pages in document
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Format source for display
    pub fn format_reference(&self) -> String {
        match self.page_count {
            Some(pages) => format!("{} ({} pages)", self.filename, pages),
            None => self.filename.clone(),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector, empty until the chunk is embedded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Character range in the source record, `[char_start, char_end)`
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("docx"), FileType::Docx);
        assert_eq!(FileType::from_extension("Doc"), FileType::Doc);
        assert_eq!(FileType::from_extension("txt"), FileType::Txt);
        assert_eq!(
            FileType::from_extension("md"),
            FileType::Unsupported("md".to_string())
        );
        assert!(!FileType::from_path(Path::new("notes")).is_supported());
        assert!(FileType::from_path(Path::new("docs/Catalog.TXT")).is_supported());
    }

    #[test]
    fn test_chunk_embedding_not_serialized_when_empty() {
        let source = ChunkSource {
            filename: "a.txt".to_string(),
            file_type: FileType::Txt,
            page_count: None,
        };
        let chunk = Chunk::new(Uuid::new_v4(), "hello".to_string(), source, 0, 5, 0);
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["source"]["file_type"], "txt");
    }
}
