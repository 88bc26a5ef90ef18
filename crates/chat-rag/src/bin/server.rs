//! Chat server binary
//!
//! Run with: cargo run -p chat-rag --bin chat-rag-server -- --mode lookup

use chat_rag::{
    config::{RagConfig, ResolverMode},
    server::ChatServer,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "chat-rag-server", version, about = "Document chat assistant")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CHAT_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Answer resolver (overrides chat.mode)
    #[arg(short, long, value_enum)]
    mode: Option<ResolverMode>,

    /// Listen port (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Documents folder (overrides ingestion.docs_dir)
    #[arg(long)]
    docs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RagConfig::load_from(path)?,
        None => {
            let mut config = RagConfig::default();
            config.apply_env();
            config
        }
    };
    if let Some(mode) = args.mode {
        config.chat.mode = mode;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(docs_dir) = args.docs_dir {
        config.ingestion.docs_dir = docs_dir;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Mode: {}", config.chat.mode);
    if config.chat.mode == ResolverMode::Retrieval {
        tracing::info!("  - Documents: {}", config.ingestion.docs_dir.display());
        tracing::info!("  - Embedding model: {}", config.llm.embed_model);
        tracing::info!("  - LLM model: {}", config.llm.generate_model);
        tracing::info!(
            "  - Chunking: {} chars, {} overlap",
            config.chunking.chunk_size,
            config.chunking.chunk_overlap
        );
    }

    let server = ChatServer::new(config).await?;

    println!("\nServer starting...");
    println!("  Chat: http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
