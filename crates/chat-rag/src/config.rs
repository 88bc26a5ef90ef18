//! Configuration for the chat service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Document ingestion configuration
    pub ingestion: IngestionConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Knowledge store configuration
    pub knowledge_store: KnowledgeStoreConfig,
    /// Chat session configuration
    pub chat: ChatConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (`OLLAMA_HOST`)
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                self.llm.base_url = host.trim().trim_end_matches('/').to_string();
            }
        }
    }

    /// Check values that would otherwise fail deep inside the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.knowledge_store.top_k == 0 {
            return Err(Error::Config("knowledge_store.top_k must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            enable_cors: true,
        }
    }
}

/// What to do with files whose extension has no loader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Skip the file and log a warning
    #[default]
    Warn,
    /// Skip the file quietly (debug log only)
    Skip,
    /// Abort ingestion
    Error,
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Folder scanned for documents (not recursive)
    pub docs_dir: PathBuf,
    /// Handling of unsupported extensions
    pub on_unsupported: UnsupportedPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("./docs"),
            on_unsupported: UnsupportedPolicy::Warn,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 10,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = fail on first error)
    pub max_retries: u32,
    /// Forward model tokens as they are generated instead of replaying the full answer
    pub live_stream: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 0,
            live_stream: false,
        }
    }
}

/// Knowledge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeStoreConfig {
    /// Directory holding the persisted index
    pub persist_dir: PathBuf,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Re-ingest and re-embed on every start; when false an existing index is reopened
    pub rebuild_on_start: bool,
}

impl KnowledgeStoreConfig {
    /// Path of the index file inside the persistence directory
    pub fn index_path(&self) -> PathBuf {
        self.persist_dir.join("index.json")
    }
}

impl Default for KnowledgeStoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("./data"),
            top_k: 6,
            rebuild_on_start: true,
        }
    }
}

/// Which answer resolver backs the chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Static question/answer table
    Lookup,
    /// Conversational retrieval over ingested documents
    #[default]
    Retrieval,
}

impl std::fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverMode::Lookup => write!(f, "lookup"),
            ResolverMode::Retrieval => write!(f, "retrieval"),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Resolver mode
    pub mode: ResolverMode,
    /// Q&A table for lookup mode (built-in table when unset)
    pub qna_path: Option<PathBuf>,
    /// Answer shown when the lookup table has no match
    pub fallback_answer: String,
    /// Delay between streamed words in milliseconds
    pub stream_delay_ms: u64,
    /// Number of recent turns passed to the retrieval chain
    pub max_history_turns: usize,
    /// Instruction block placed at the top of the answer prompt
    pub instructions: String,
}

impl ChatConfig {
    /// Delay between streamed words
    pub fn stream_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stream_delay_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ResolverMode::Retrieval,
            qna_path: None,
            fallback_answer: "Xin lỗi, tôi không biết câu trả lời cho câu hỏi này.".to_string(),
            stream_delay_ms: 50,
            max_history_turns: 5,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

/// Shop assistant instructions (Vietnamese): open by asking only for color and size,
/// stay brief and on topic, and answer "don't know" instead of inventing facts.
pub const DEFAULT_INSTRUCTIONS: &str = "\
Mở đầu, bạn chỉ cần hỏi khách thông tin về màu sắc và cỡ áo một cách ngắn gọn.
Chỉ hội thoại ngắn gọn trọng tâm câu hỏi một cách lịch sự.
Không cung cấp quá nhiều thông tin không liên quan đến câu hỏi.
Nếu không tìm thấy câu trả lời thì trả lời là không biết, không được cố ý tạo câu trả lời không đúng.";
