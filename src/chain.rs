//! Conversational retrieval chain.
//!
//! Per request: embed the question, take the top-K chunks from the index,
//! assemble one grounded prompt, and make a single model call. The chain is
//! stateless: the caller-supplied history is the only conversation state,
//! so concurrent requests cannot bleed into each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::index::{ScoredChunk, VectorIndex};
use crate::llm::ChatModel;

/// One prior turn of the conversation, supplied by the caller. Oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// A retrieved chunk cited as evidence for an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    pub text: String,
    pub file: String,
    pub page: Option<u32>,
    pub score: f32,
}

/// Result of a completed chain invocation. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
}

/// Composes retrieval and generation. Holds only immutable shared state, so
/// one instance serves all requests concurrently.
pub struct ConversationalChain {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    retriever_k: usize,
}

impl ConversationalChain {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        retriever_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            retriever_k,
        }
    }

    /// Answer a question. Retrieval uses the raw question text; history is
    /// rendered into the prompt but not used for query rewriting. Any
    /// provider error propagates unchanged; no retry, no partial answer.
    pub async fn ask(&self, question: &str, history: &[ChatTurn]) -> Result<ChainAnswer> {
        let query_embedding = self.embedder.embed(question).await?;
        let retrieved = self.index.nearest(&query_embedding, self.retriever_k);

        debug!(
            retrieved = retrieved.len(),
            history_turns = history.len(),
            "context retrieved"
        );

        let prompt = build_prompt(question, &retrieved, history);
        let answer = self.chat.generate(&prompt).await?;

        let sources = retrieved
            .into_iter()
            .map(|hit| SourceChunk {
                text: hit.chunk.text,
                file: hit.chunk.source.file,
                page: hit.chunk.source.page,
                score: hit.score,
            })
            .collect();

        Ok(ChainAnswer { answer, sources })
    }
}

/// Assemble the grounded prompt: instructions, numbered context blocks with
/// their citations, prior turns, then the question.
fn build_prompt(question: &str, retrieved: &[ScoredChunk], history: &[ChatTurn]) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant. Answer the question using ONLY the provided context. \
         If the context does not contain the answer, say that you do not know. \
         Do not make up information.\n\nContext:\n",
    );

    if retrieved.is_empty() {
        prompt.push_str("(no relevant context found)\n");
    }
    for (i, hit) in retrieved.iter().enumerate() {
        let citation = match hit.chunk.source.page {
            Some(page) => format!("{}, page {}", hit.chunk.source.file, page),
            None => hit.chunk.source.file.clone(),
        };
        prompt.push_str(&format!("\n[{}] ({})\n{}\n", i + 1, citation, hit.chunk.text));
    }

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in history {
            let speaker = if turn.role.eq_ignore_ascii_case("assistant") {
                "Assistant"
            } else {
                "User"
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
    }

    prompt.push_str(&format!("\nQuestion: {}\n\nAnswer:", question));
    prompt
}
