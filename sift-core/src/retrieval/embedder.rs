//! Embedding generation using model providers.
//!
//! This module converts query text into vector embeddings through the
//! configured provider, bounding every call with a deadline.

use crate::provider::{self, Provider, ProviderError};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider call failed or timed out.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered with a zero-length vector.
    #[error("Empty embedding returned for input")]
    EmptyEmbedding,
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates vector embeddings for text using a provider embedding model.
///
/// # Supported Models
///
/// Common embedding models:
/// - `nomic-embed-text` - 768-dimensional embeddings, good general purpose
/// - `mxbai-embed-large` - 1024-dimensional embeddings, higher quality
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider is unreachable or does not answer within the deadline
    /// - The model is not available
    /// - The provider returns an empty vector
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding =
            provider::with_deadline(self.timeout, self.provider.embed(text, &self.model)).await?;
        if embedding.is_empty() {
            return Err(EmbedderError::EmptyEmbedding);
        }
        Ok(embedding)
    }

    /// Embeds every text, keeping at most `concurrency` calls in flight.
    ///
    /// Output order matches input order. The first failure aborts the batch.
    pub async fn embed_all(&self, texts: &[String], concurrency: usize) -> Result<Vec<Vec<f32>>> {
        stream::iter(texts.iter().cloned())
            .map(|text| async move { self.embed(&text).await })
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}
