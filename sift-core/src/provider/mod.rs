//! Model service abstraction layer.
//!
//! This module defines the interface the pipeline uses to reach the external
//! text-generation and embedding services, plus an Ollama HTTP implementation.

mod types;
pub mod ollama;

// Re-export common types
pub use types::{
    EmbedRequest,
    EmbedResponse,
    GenerateRequest,
    Message,
    Provider,
    ProviderError,
    Result,
};

pub use ollama::OllamaProvider;

pub(crate) use types::with_deadline;
