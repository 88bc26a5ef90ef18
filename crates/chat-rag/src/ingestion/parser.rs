//! Format loaders for PDF, Word and plain text

use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// SHA-256 of the content
    pub content_hash: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

/// Dispatches raw bytes to the loader for their file type
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_path(std::path::Path::new(filename));

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx | FileType::Doc => Self::parse_docx(filename, data, file_type),
            FileType::Txt => Ok(Self::parse_text(data)),
            FileType::Unsupported(ext) => Err(Error::UnsupportedFileType(format!(
                "{} ({})",
                filename,
                if ext.is_empty() { "no extension" } else { ext.as_str() }
            ))),
        }
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let content = Self::extract_pdf_text(filename, data)?;

        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(_) => None,
        };

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_content(&content),
            content,
            total_pages,
        })
    }

    /// Run pdf-extract on its own thread so a panic or a hang on a bad font
    /// cannot take down ingestion, then fall back to lopdf.
    fn extract_pdf_text(filename: &str, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let extracted = isolate(PDF_EXTRACT_TIMEOUT, move || {
            pdf_extract::extract_text_from_mem(&data_vec).map_err(|e| e.to_string())
        });

        match extracted {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => {
                tracing::debug!("pdf-extract found no text in {}, trying fallback", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed on {}: {}, trying fallback", filename, e);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(Isolation::TimedOut) => {
                tracing::error!(
                    "PDF extraction of {} timed out after {}s",
                    filename,
                    PDF_EXTRACT_TIMEOUT.as_secs()
                );
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(Isolation::Crashed) => {
                tracing::error!("PDF extraction thread crashed on {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
        }
    }

    /// Page-by-page text extraction with lopdf
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let text = doc
            .extract_text(&page_numbers)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        if text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF has no extractable text (image-based or encrypted)",
            ));
        }
        Ok(text)
    }

    /// Parse a Word document; `.doc` files are only readable when they are OOXML inside
    fn parse_docx(filename: &str, data: &[u8], file_type: FileType) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();

        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(ParsedDocument {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
        })
    }

    /// Parse plain text
    fn parse_text(data: &[u8]) -> ParsedDocument {
        let content = String::from_utf8_lossy(data).to_string();

        ParsedDocument {
            file_type: FileType::Txt,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
        }
    }
}

/// Why an isolated job produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Isolation {
    TimedOut,
    Crashed,
}

/// Run `job` on a separate thread and wait at most `timeout` for its result.
///
/// A job that overruns keeps running detached; its result is dropped.
fn isolate<T, F>(timeout: Duration, job: F) -> std::result::Result<T, Isolation>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(job());
    });

    match rx.recv_timeout(timeout) {
        Ok(value) => {
            let _ = handle.join();
            Ok(value)
        }
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Isolation::TimedOut),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            Err(Isolation::Crashed)
        }
    }
}

/// Hash content for the document registry
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
