//! Corpus store abstraction and factory.
//!
//! The query pipeline only reads chunks. Ingestion lives elsewhere and fills
//! a store through its own API ([`InMemoryCorpus::add`] or by writing the
//! JSON file that [`JsonCorpus`] reads).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::Chunk;
use crate::config::CorpusConfig;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse corpus: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corpus lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CorpusError>;

/// Read access to stored chunks.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Returns every chunk that carries an embedding, in storage order.
    async fn list_chunks_with_embedding(&self) -> Result<Vec<Chunk>>;

    /// Returns the number of chunks with an embedding.
    async fn count(&self) -> Result<usize>;
}

/// Creates a corpus store for the configured mode.
pub fn create_corpus_store(config: &CorpusConfig) -> Arc<dyn CorpusStore> {
    match config {
        CorpusConfig::Memory => Arc::new(InMemoryCorpus::new()),
        CorpusConfig::Json { path } => Arc::new(JsonCorpus::new(path)),
    }
}

/// Chunks held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: RwLock::new(chunks),
        }
    }

    pub fn add(&self, chunks: impl IntoIterator<Item = Chunk>) -> Result<()> {
        let mut stored = self.chunks.write().map_err(|_| CorpusError::Poisoned)?;
        stored.extend(chunks);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.chunks.write().map_err(|_| CorpusError::Poisoned)?.clear();
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpus {
    async fn list_chunks_with_embedding(&self) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().map_err(|_| CorpusError::Poisoned)?;
        Ok(chunks.iter().filter(|c| !c.embedding.is_empty()).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        let chunks = self.chunks.read().map_err(|_| CorpusError::Poisoned)?;
        Ok(chunks.iter().filter(|c| !c.embedding.is_empty()).count())
    }
}

/// A JSON array of chunks on disk.
///
/// The file is re-read on every listing so that chunks written by an external
/// ingestion process become visible without a restart. A missing file is an
/// empty corpus.
#[derive(Debug, Clone)]
pub struct JsonCorpus {
    path: PathBuf,
}

impl JsonCorpus {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<Vec<Chunk>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Corpus file not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<Chunk> = serde_json::from_str(&contents)?;
        let total = chunks.len();
        let embedded: Vec<Chunk> = chunks
            .into_iter()
            .filter(|c| !c.embedding.is_empty())
            .collect();
        debug!(
            path = %self.path.display(),
            total,
            embedded = embedded.len(),
            "Loaded corpus"
        );
        Ok(embedded)
    }
}

#[async_trait]
impl CorpusStore for JsonCorpus {
    async fn list_chunks_with_embedding(&self) -> Result<Vec<Chunk>> {
        self.load().await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new(id, "doc", 0, "some content", embedding)
    }

    #[tokio::test]
    async fn test_in_memory_skips_chunks_without_embedding() {
        let corpus = InMemoryCorpus::new();
        corpus
            .add(vec![chunk("a", vec![1.0]), chunk("b", vec![]), chunk("c", vec![0.5])])
            .unwrap();

        let ids: Vec<String> = corpus
            .list_chunks_with_embedding()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(corpus.count().await.unwrap(), 2);

        corpus.clear().unwrap();
        assert_eq!(corpus.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_json_corpus_reads_file_each_time() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let first = serde_json::to_string(&vec![chunk("a", vec![1.0])]).unwrap();
        write!(file, "{}", first).unwrap();

        let corpus = JsonCorpus::new(file.path());
        assert_eq!(corpus.count().await.unwrap(), 1);

        let second =
            serde_json::to_string(&vec![chunk("a", vec![1.0]), chunk("b", vec![0.0, 1.0])])
                .unwrap();
        std::fs::write(file.path(), second).unwrap();
        assert_eq!(corpus.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_json_corpus_derives_word_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id":"a","doc_id":"d","chunk_index":0,"content":"Cats are small pets","embedding":[1.0]}},
                {{"id":"b","doc_id":"d","chunk_index":1,"content":"Dogs bark","embedding":[1.0],"word_count":99}}
            ]"#
        )
        .unwrap();

        let chunks = JsonCorpus::new(file.path())
            .list_chunks_with_embedding()
            .await
            .unwrap();
        assert_eq!(chunks[0].word_count, 4);
        assert_eq!(chunks[0], Chunk::new("a", "d", 0, "Cats are small pets", vec![1.0]));
        assert_eq!(chunks[1].word_count, 2);
    }

    #[tokio::test]
    async fn test_json_corpus_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = JsonCorpus::new(dir.path().join("absent.json"));
        assert!(corpus.list_chunks_with_embedding().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_corpus_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let corpus = JsonCorpus::new(file.path());
        assert!(matches!(
            corpus.list_chunks_with_embedding().await,
            Err(CorpusError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_factory_builds_requested_mode() {
        let store = create_corpus_store(&CorpusConfig::Memory);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
