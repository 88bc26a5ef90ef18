//! Document ingestion: folder scan, format loaders and chunking

mod chunker;
mod parser;
mod pipeline;

pub use chunker::{TextChunker, TextSpan};
pub use parser::{FileParser, ParsedDocument};
pub use pipeline::{IngestPipeline, IngestReport, SkippedFile};
