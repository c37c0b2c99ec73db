//! Retrieval-augmented chatbot backend.
//!
//! Loads a small knowledge base (a plain-text file and a PDF), splits it into
//! overlapping chunks, embeds the chunks into a locally persisted vector
//! index, and serves a conversational question-answering endpoint over it.
//!
//! The startup pipeline runs once, before the listener binds:
//! configuration -> ingestion -> chunking -> vector index (load or build).
//! After that every request flows handler -> chain -> index -> LLM.

pub mod chain;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod handlers;
pub mod index;
pub mod ingestion;
pub mod llm;

use std::sync::Arc;

use chain::ConversationalChain;

pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "askdocs";

/// State shared across request handlers.
///
/// The chain holds only immutable data, so cloning the state per request is
/// a couple of `Arc` bumps.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<ConversationalChain>,
}
