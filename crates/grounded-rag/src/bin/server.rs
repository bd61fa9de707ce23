//! RAG Server binary
//!
//! Run with: cargo run -p grounded-rag --bin grounded-rag-server -- serve --config rag.toml

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use grounded_rag::{config::RagConfig, server::RagServer, server::state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grounded-rag-server", version, about = "Document Q&A with source citations")]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Ingest files or directories into the document store
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::from_file(path)?,
        None => {
            let config = RagConfig::default();
            config.validate()?;
            config
        }
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} ({})", config.embeddings.provider, config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Store: {} (table {}, metric {})",
        config.store.storage_path.display(),
        config.store.table_name,
        config.store.metric
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = RagServer::new(config).await?;

            println!("\nServer starting...");
            println!("  API: http://{}", server.address());
            println!("  Health: http://{}/health", server.address());
            println!("\nEndpoints:");
            println!("  POST   /respond          - Ask a question");
            println!("  POST   /respond_stream   - Ask a question, streamed");
            println!("  POST   /upload_file      - Upload documents");
            println!("  GET    /get_document     - Look up a document by name");
            println!("  PATCH  /update_document  - Set a metadata field");
            println!("  DELETE /delete_document  - Delete a document by name");
            println!("\nPress Ctrl+C to stop\n");

            server.start().await?;
        }
        Command::Ingest { paths } => {
            let state = AppState::new(config).await?;
            let report = state.pipeline().ingest_paths(&paths).await?;

            for doc in &report.documents {
                println!("ingested  {}  {}", doc.id, doc.name);
            }
            for skipped in &report.skipped {
                println!("skipped   {}  ({})", skipped.filename, skipped.reason);
            }
            println!(
                "\n{} ingested, {} skipped, {} documents in store",
                report.documents.len(),
                report.skipped.len(),
                state.store().len().await?
            );
        }
    }

    Ok(())
}
