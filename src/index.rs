//! Persistent vector index.
//!
//! Chunks and their embedding vectors live in a flat store that is written
//! to disk once at build time and loaded whole on later startups. The store
//! is append-never: there are no update or delete operations, and after
//! construction it is shared read-only across requests.
//!
//! A manifest persisted next to the records carries a fingerprint of the
//! source files, so a restart rebuilds the index when the knowledge base (or
//! the embedding model) changed and reuses it otherwise.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::ingestion::chunker::Chunk;

/// Bumped when the on-disk layout changes.
const FORMAT_VERSION: u32 = 1;

const INDEX_FILE: &str = "index.json";
const MANIFEST_FILE: &str = "manifest.json";

/// One indexed chunk with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Build provenance persisted next to the records; consulted at startup to
/// decide load-vs-rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    /// Hex SHA-256 over the source files' names and bytes.
    pub source_fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// In-memory nearest-neighbor index over chunk embeddings.
pub struct VectorIndex {
    records: Vec<IndexRecord>,
    dimension: usize,
}

/// A retrieval hit: chunk plus cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl VectorIndex {
    /// Embed every chunk and assemble the index. Provider failures
    /// propagate; at startup they are fatal.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self> {
        if chunks.is_empty() {
            return Err(AppError::Index {
                message: "cannot build an index from zero chunks".to_string(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Index {
                message: format!("embedded {} of {} chunks", embeddings.len(), chunks.len()),
            });
        }

        let dimension = embeddings[0].len();
        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            if embedding.len() != dimension {
                return Err(AppError::Index {
                    message: format!(
                        "inconsistent embedding dimension: expected {dimension}, got {}",
                        embedding.len()
                    ),
                });
            }
            records.push(IndexRecord { chunk, embedding });
        }

        Ok(Self { records, dimension })
    }

    /// Persist records and manifest into `dir`, creating it if needed.
    pub fn save(
        &self,
        dir: &Path,
        embedding_model: &str,
        source_fingerprint: &str,
    ) -> Result<IndexManifest> {
        fs::create_dir_all(dir)?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dimension: self.dimension,
            chunk_count: self.records.len(),
            source_fingerprint: source_fingerprint.to_string(),
            built_at: Utc::now(),
        };

        fs::write(dir.join(INDEX_FILE), serde_json::to_vec(&self.records)?)?;
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;
        Ok(manifest)
    }

    /// Load a previously persisted index without touching the embedding
    /// provider. Corrupt persisted state is an error; there is no fallback.
    pub fn load(dir: &Path) -> Result<(Self, IndexManifest)> {
        let manifest: IndexManifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE))?)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(AppError::Index {
                message: format!(
                    "unsupported index format version {}",
                    manifest.format_version
                ),
            });
        }

        let records: Vec<IndexRecord> = serde_json::from_slice(&fs::read(dir.join(INDEX_FILE))?)?;
        if records.len() != manifest.chunk_count {
            return Err(AppError::Index {
                message: format!(
                    "manifest says {} chunks, index holds {}",
                    manifest.chunk_count,
                    records.len()
                ),
            });
        }

        Ok((
            Self {
                records,
                dimension: manifest.dimension,
            },
            manifest,
        ))
    }

    /// Startup decision rule: reuse the persisted index when its manifest
    /// matches the current sources and embedding model, rebuild otherwise.
    pub async fn open_or_build(
        dir: &Path,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        source_fingerprint: &str,
    ) -> Result<Self> {
        if dir.join(MANIFEST_FILE).exists() {
            let (index, manifest) = Self::load(dir)?;
            if manifest.source_fingerprint == source_fingerprint
                && manifest.embedding_model == embedder.model_name()
            {
                info!(
                    dir = %dir.display(),
                    chunks = index.len(),
                    "loaded vector index from disk, no embedding calls needed"
                );
                return Ok(index);
            }
            info!(dir = %dir.display(), "persisted index is stale, rebuilding");
        } else {
            info!(dir = %dir.display(), "no persisted index found, building");
        }

        let index = Self::build(chunks, embedder).await?;
        index.save(dir, embedder.model_name(), source_fingerprint)?;
        info!(
            dir = %dir.display(),
            chunks = index.len(),
            "vector index built and persisted"
        );
        Ok(index)
    }

    /// Exact nearest-neighbor scan: top-`k` records by cosine similarity,
    /// most-similar first. Stable sort keeps insertion order on ties.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(query, &record.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.records[i].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Hex SHA-256 over each source file's name and contents, in order. Missing
/// files contribute only their name, so adding or removing a source also
/// changes the fingerprint.
pub fn source_fingerprint(paths: &[&Path]) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        hasher.update(path.display().to_string().as_bytes());
        if path.exists() {
            hasher.update(fs::read(path)?);
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::ingestion::SourceMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(seq, text)| Chunk {
                text: (*text).to_string(),
                source: SourceMetadata {
                    file: "knowledge.txt".to_string(),
                    page: None,
                },
                seq,
            })
            .collect()
    }

    struct CountingEmbedder {
        inner: MockEmbedder,
        batches: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: MockEmbedder::new(16),
                batches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    #[tokio::test]
    async fn nearest_returns_most_similar_first() {
        let embedder = MockEmbedder::new(32);
        let index = VectorIndex::build(chunks(&["apple", "banana", "apple pie"]), &embedder)
            .await
            .unwrap();

        let query = embedder.embed("apple").await.unwrap();
        let hits = index.nearest(&query, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "apple");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn nearest_caps_at_index_size() {
        let embedder = MockEmbedder::new(16);
        let index = VectorIndex::build(chunks(&["one", "two"]), &embedder)
            .await
            .unwrap();
        let query = embedder.embed("one").await.unwrap();
        assert_eq!(index.nearest(&query, 10).len(), 2);
    }

    #[tokio::test]
    async fn save_load_round_trip_preserves_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = MockEmbedder::new(32);
        let index = VectorIndex::build(chunks(&["one", "two", "three", "four"]), &embedder)
            .await
            .unwrap();
        index.save(dir.path(), embedder.model_name(), "fp").unwrap();

        let (loaded, manifest) = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(manifest.chunk_count, 4);
        assert_eq!(manifest.source_fingerprint, "fp");
        assert_eq!(loaded.dimension(), index.dimension());

        let query = embedder.embed("three").await.unwrap();
        let before: Vec<String> = index
            .nearest(&query, 3)
            .into_iter()
            .map(|hit| hit.chunk.text)
            .collect();
        let after: Vec<String> = loaded
            .nearest(&query, 3)
            .into_iter()
            .map(|hit| hit.chunk.text)
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn open_or_build_reuses_matching_index() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = CountingEmbedder::new();

        VectorIndex::open_or_build(dir.path(), chunks(&["a", "b"]), &embedder, "fp-1")
            .await
            .unwrap();
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 1);

        // Same fingerprint: loaded from disk, no further provider calls.
        VectorIndex::open_or_build(dir.path(), chunks(&["a", "b"]), &embedder, "fp-1")
            .await
            .unwrap();
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 1);

        // Changed fingerprint: rebuilt.
        VectorIndex::open_or_build(dir.path(), chunks(&["a", "b"]), &embedder, "fp-2")
            .await
            .unwrap();
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn build_rejects_empty_chunks() {
        let embedder = MockEmbedder::new(16);
        assert!(VectorIndex::build(Vec::new(), &embedder).await.is_err());
    }

    #[test]
    fn load_rejects_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();
        assert!(VectorIndex::load(dir.path()).is_err());
    }

    #[test]
    fn fingerprint_tracks_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.txt");
        std::fs::write(&path, "v1").unwrap();
        let first = source_fingerprint(&[path.as_path()]).unwrap();
        std::fs::write(&path, "v2").unwrap();
        let second = source_fingerprint(&[path.as_path()]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn fingerprint_is_stable_for_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.txt");
        std::fs::write(&path, "fixed").unwrap();
        let first = source_fingerprint(&[path.as_path()]).unwrap();
        let second = source_fingerprint(&[path.as_path()]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
