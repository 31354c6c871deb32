use serde::{Deserialize, Serialize};

use crate::text::tokenize;

/// An immutable unit of retrievable text.
///
/// Chunks are produced by the ingestion side and are only read here. The
/// `doc_id` is a plain reference to the owning document; the chunk does not
/// own it.
///
/// # Example
///
/// ```
/// # use sift_core::retrieval::Chunk;
/// let chunk = Chunk::new("doc-1:0", "doc-1", 0, "Cats are small pets.", vec![0.1, 0.9]);
/// assert_eq!(chunk.word_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredChunk")]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Token count, fixed when the chunk is created. Recomputed on load.
    pub word_count: usize,
}

/// On-disk chunk shape. Any stored `word_count` is ignored.
#[derive(Deserialize)]
struct StoredChunk {
    id: String,
    doc_id: String,
    chunk_index: usize,
    content: String,
    embedding: Vec<f32>,
}

impl From<StoredChunk> for Chunk {
    fn from(stored: StoredChunk) -> Self {
        Chunk::new(
            stored.id,
            stored.doc_id,
            stored.chunk_index,
            stored.content,
            stored.embedding,
        )
    }
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        doc_id: impl Into<String>,
        chunk_index: usize,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let content = content.into();
        let word_count = tokenize(&content).len();
        Self {
            id: id.into(),
            doc_id: doc_id.into(),
            chunk_index,
            content,
            embedding,
            word_count,
        }
    }
}

/// One phrasing of the user's question.
///
/// Index 0 is always the original question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariation {
    pub index: usize,
    pub text: String,
}

impl QueryVariation {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    pub fn is_original(&self) -> bool {
        self.index == 0
    }
}

/// A chunk paired with its scores for one query variation.
///
/// Only exists while ranking; after deduplication the ranker keeps, per chunk
/// id, the candidate with the highest `hybrid_score`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1].
    pub vector_score: f64,
    /// Unbounded, non-negative.
    pub bm25_score: f64,
    pub hybrid_score: f64,
    /// The variation that produced this score.
    pub variation: QueryVariation,
}
