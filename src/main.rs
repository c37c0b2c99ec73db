use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use askdocs::chain::ConversationalChain;
use askdocs::config::AppConfig;
use askdocs::embeddings::{Embedder, GeminiEmbedder, MockEmbedder};
use askdocs::handlers;
use askdocs::index::{source_fingerprint, VectorIndex};
use askdocs::ingestion::{self, chunker};
use askdocs::llm::{ChatModel, GeminiChatModel, MockChatModel};
use askdocs::AppState;

/// Graceful shutdown signal handler
/// Listens for SIGINT (Ctrl+C) and SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration; the process refuses to start without it.
    dotenvy::dotenv().ok();
    let config = match AppConfig::build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("Set the required environment variables (see .env.example) and restart.");
            std::process::exit(1);
        }
    };

    // 2. Logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.to_lowercase()))
        .init();

    tracing::info!(version = askdocs::VERSION, "starting askdocs");

    // 3. Provider clients.
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let (embedder, chat): (Arc<dyn Embedder>, Arc<dyn ChatModel>) = if config.use_mock_providers() {
        tracing::warn!("GOOGLE_API_KEY=mock, using in-process mock providers");
        (
            Arc::new(MockEmbedder::new(768)),
            Arc::new(MockChatModel::default()),
        )
    } else {
        (
            Arc::new(GeminiEmbedder::new(
                config.google_api_key.clone(),
                config.embedding_model.clone(),
                timeout,
            )?),
            Arc::new(GeminiChatModel::new(
                config.google_api_key.clone(),
                config.llm_model.clone(),
                timeout,
            )?),
        )
    };

    // 4. Ingest knowledge sources. Serving with nothing to answer from is
    //    refused here rather than at query time.
    let txt_path = config.txt_path();
    let pdf_path = config.pdf_path();
    let documents = ingestion::load_documents(&txt_path, &pdf_path)?;
    tracing::info!(documents = documents.len(), "knowledge sources loaded");

    // 5. Chunk.
    let chunks = chunker::split_documents(&documents, config.chunk_size, config.chunk_overlap)?;
    tracing::info!(chunks = chunks.len(), "chunks created");

    // 6. Vector index: reuse the persisted copy when sources and model are
    //    unchanged, rebuild otherwise.
    let fingerprint = source_fingerprint(&[txt_path.as_path(), pdf_path.as_path()])?;
    let index = VectorIndex::open_or_build(
        Path::new(&config.index_dir),
        chunks,
        embedder.as_ref(),
        &fingerprint,
    )
    .await?;

    // 7. Conversational chain, shared read-only across requests.
    let chain = ConversationalChain::new(Arc::new(index), embedder, chat, config.retriever_k);
    let state = AppState {
        chain: Arc::new(chain),
    };

    // 8. Serve with graceful shutdown.
    let app = handlers::create_router(state, &config);
    let addr = config.socket_addr()?;
    tracing::info!(address = %addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
