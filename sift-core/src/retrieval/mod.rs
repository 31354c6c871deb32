//! Hybrid retrieval over the chunk corpus.
//!
//! # Overview
//!
//! A question is turned into ranked context in four steps:
//!
//! 1. **Expansion**: [`QueryExpander`] asks the generator for alternative
//!    phrasings. Failure degrades to the original question alone.
//! 2. **Embedding**: [`Embedder`] embeds every phrasing with bounded
//!    concurrency.
//! 3. **Scoring**: every (phrasing, chunk) pair gets a cosine score, a BM25
//!    score and their fixed linear blend.
//! 4. **Ranking**: [`RetrievalRanker`] keeps the best score per chunk id and
//!    returns the top results in non-increasing order.
//!
//! Chunks are read through a [`CorpusStore`]; the pipeline never writes them.

mod corpus;
mod embedder;
mod expander;
mod ranker;
pub mod scoring;
mod types;

pub use corpus::{
    create_corpus_store, CorpusError, CorpusStore, InMemoryCorpus, JsonCorpus,
};
pub use embedder::{Embedder, EmbedderError};
pub use expander::{parse_variations, Expansion, QueryExpander, DEFAULT_EXPANSION_COUNT};
pub use ranker::{
    EmbeddedVariation, MaxResults, Ranking, RankerError, RetrievalRanker, MAX_RESULTS_LIMIT,
};
pub use types::{Chunk, QueryVariation, ScoredCandidate};
