//! Common types for model service providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with a provider.
///
/// Every variant is treated as a transient service failure by the pipeline:
/// nothing here is retried inside the core.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Provider trait for model backends.
///
/// Implementations provide single-shot text generation and embeddings.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a complete response for the request.
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Generate an embedding vector for the given text.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;
}

/// Runs a provider call under a deadline.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    }
}

/// Request for a text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Convenience for a single user prompt.
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![Message::user(prompt)])
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,
    pub input: String,
}

/// Response containing embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub model: String,

    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}
