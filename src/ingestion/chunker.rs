//! Text chunking.
//!
//! Wraps `text-splitter`'s recursive boundary-aware splitter (paragraphs,
//! then sentences, then words, then characters) with the configured window
//! size and overlap. Splitting is deterministic for identical input and
//! configuration.

use serde::{Deserialize, Serialize};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

use super::{Document, SourceMetadata};
use crate::errors::{AppError, Result};

/// A bounded text window, the unit indexed and retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Metadata inherited from the parent document.
    pub source: SourceMetadata,
    /// 0-based position within the parent document.
    pub seq: usize,
}

/// Split every document into overlapping chunks of at most `chunk_size`
/// characters. Chunk order preserves document order and in-document order.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| AppError::Chunking {
            message: e.to_string(),
        })?;
    let splitter = TextSplitter::new(config);

    let mut chunks = Vec::new();
    for document in documents {
        for (seq, text) in splitter.chunks(&document.text).enumerate() {
            chunks.push(Chunk {
                text: text.to_string(),
                source: document.source.clone(),
                seq,
            });
        }
    }

    debug!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size,
        chunk_overlap,
        "documents chunked"
    );

    Ok(chunks)
}
