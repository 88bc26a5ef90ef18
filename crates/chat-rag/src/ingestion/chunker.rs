//! Fixed-size character chunking with overlap

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, Document};

use super::parser::ParsedDocument;

/// A window of the source text, positions counted in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// First character (inclusive)
    pub start: usize,
    /// Last character (exclusive)
    pub end: usize,
    /// The text of the window
    pub text: &'a str,
}

/// Splits text into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; the overlap must be smaller than the chunk size
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::Config(format!(
                "invalid chunking: size {} overlap {}",
                chunk_size, overlap
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping windows
    pub fn split<'a>(&self, text: &'a str) -> Vec<TextSpan<'a>> {
        // byte offset of every char, so windows never cut a UTF-8 sequence
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = offsets.len();
        let byte_at = |char_pos: usize| offsets.get(char_pos).copied().unwrap_or(text.len());

        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            spans.push(TextSpan {
                start,
                end,
                text: &text[byte_at(start)..byte_at(end)],
            });

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        spans
    }

    /// Chunk a parsed document; whitespace-only windows are dropped
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let source = ChunkSource {
            filename: doc.filename.clone(),
            file_type: doc.file_type.clone(),
            page_count: parsed.total_pages,
        };

        self.split(&parsed.content)
            .into_iter()
            .filter(|span| !span.text.trim().is_empty())
            .enumerate()
            .map(|(index, span)| {
                Chunk::new(
                    doc.id,
                    span.text.to_string(),
                    source.clone(),
                    span.start,
                    span.end,
                    index as u32,
                )
            })
            .collect()
    }
}
