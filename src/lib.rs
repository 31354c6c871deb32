//! sift - Hybrid retrieval and question answering pipeline
//!
//! This is the convenience wrapper crate that re-exports `sift-core`.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! sift = "0.1"
//! ```
//!
//! ```no_run
//! use sift::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default();
//! let provider = Arc::new(OllamaProvider::new(&config.llm));
//! let corpus = create_corpus_store(&config.corpus);
//! let engine = QueryEngine::new(config, provider, corpus)?;
//!
//! let result = engine.query(QueryRequest::new("Tell me about pets")).await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use sift_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use sift_core::{
        create_corpus_store, Chunk, Config, CorpusStore, InMemoryCorpus, OllamaProvider,
        Provider, QueryEngine, QueryError, QueryRequest, QueryResult,
    };
}
