//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the Provider trait.

use super::types::*;
use crate::config::LlmConfig;
use async_trait::async_trait;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider for the configured base URL.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(&LlmConfig::default())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let ollama_request = OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            options: {
                let mut opts = HashMap::new();
                opts.insert("temperature".to_string(), serde_json::json!(request.temperature));
                Some(opts)
            },
            stream: true,
        };

        let response = self.http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut content = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();
                if line.len() <= 1 {
                    continue;
                }
                append_stream_line(&line[..line.len() - 1], &mut content)?;
            }
        }

        // Last line may arrive without a trailing newline.
        if !buffer.is_empty() {
            append_stream_line(&buffer, &mut content)?;
        }

        debug!(model = %request.model, chars = content.len(), "Generation completed");
        Ok(content)
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);

        let embed_request = EmbedRequest {
            model: model.to_string(),
            input: text.to_string(),
        };

        let response = self.http_client
            .post(&url)
            .json(&embed_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let embed_response = response.json::<EmbedResponse>().await?;

        embed_response.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }
}

/// Parses one NDJSON line of a streamed chat response into `content`.
fn append_stream_line(line: &[u8], content: &mut String) -> Result<()> {
    let line_str = String::from_utf8_lossy(line);
    if line_str.trim().is_empty() {
        return Ok(());
    }
    let response: OllamaChatResponse = serde_json::from_str(&line_str)?;
    if let Some(error) = response.error {
        return Err(ProviderError::Api(error));
    }
    if let Some(message) = response.message {
        content.push_str(&message.content);
    }
    Ok(())
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<String, serde_json::Value>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}
