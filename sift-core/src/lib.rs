//! sift-core - Hybrid retrieval and question answering
//!
//! Turns a natural-language question into ranked context and a generated
//! answer:
//! - Query expansion through the generation service
//! - Hybrid scoring (BM25 blended with embedding cosine similarity)
//! - Result caching with per-entry lifetimes and single-flight deduplication
//! - Lexical answer evaluation and running query metrics
//! - A Unix socket server exposing the pipeline
//!
//! ## Primary API
//!
//! Embed the pipeline through [`QueryEngine`], or run it behind a [`Server`].

// Public modules
pub mod cache;
pub mod config;
pub mod engine;
pub mod evaluation;
pub mod metrics;
pub mod provider;
pub mod retrieval;
pub mod server;
pub mod text;

// Public exports
pub use config::Config;
pub use engine::{
    HealthReport, QueryEngine, QueryError, QueryRequest, QueryResult, Source, ValidationError,
};
pub use evaluation::{EvaluationScores, Evaluator};
pub use metrics::{MetricsSnapshot, MetricsTracker};
pub use server::Server;

// Collaborator exports
pub use provider::{GenerateRequest, Message, OllamaProvider, Provider, ProviderError};
pub use retrieval::{create_corpus_store, Chunk, CorpusStore, InMemoryCorpus, JsonCorpus};
