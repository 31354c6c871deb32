//! Query orchestration.
//!
//! [`QueryEngine`] is the boundary the service layer talks to. One query runs
//! as: validate, cache lookup, then (once per key across concurrent callers)
//! load corpus, expand, embed, rank, generate, evaluate and cache. Every
//! completed query, hit or miss or failure, is reported to the metrics
//! tracker. Rejected requests are not.

mod error;
mod request;

pub use error::{EngineError, QueryError, ServiceStage, ValidationError};
pub use request::{
    QueryRequest, QueryResult, Source, SourceMetadata, ValidatedQuery, EMPTY_CORPUS_ANSWER,
};
pub use crate::retrieval::{MaxResults, MAX_RESULTS_LIMIT};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache, SingleFlight};
use crate::config::Config;
use crate::evaluation::Evaluator;
use crate::metrics::{MetricsSnapshot, MetricsTracker};
use crate::provider::{self, GenerateRequest, Message, Provider};
use crate::retrieval::{
    CorpusStore, EmbeddedVariation, Embedder, QueryExpander, Ranking, RetrievalRanker,
};

/// Liveness summary for the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `"ok"`, or `"degraded"` when the corpus cannot be read.
    pub status: String,
    pub corpus_chunks: Option<usize>,
    pub cache_entries: u64,
    pub metrics: MetricsSnapshot,
}

/// Shared handle to the query pipeline. Cloning is cheap.
#[derive(Clone)]
pub struct QueryEngine {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    provider: Arc<dyn Provider>,
    corpus: Arc<dyn CorpusStore>,
    expander: QueryExpander,
    embedder: Embedder,
    ranker: RetrievalRanker,
    evaluator: Evaluator,
    cache: ResultCache<QueryResult>,
    flights: SingleFlight<QueryResult, QueryError>,
    metrics: MetricsTracker,
}

impl QueryEngine {
    pub fn new(
        config: Config,
        provider: Arc<dyn Provider>,
        corpus: Arc<dyn CorpusStore>,
    ) -> Result<Self, EngineError> {
        let cache = ResultCache::new(config.cache.max_entries, config.cache.default_ttl());
        Self::with_cache(config, provider, corpus, cache)
    }

    /// Builds an engine around an existing cache, e.g. one with a manual clock.
    pub fn with_cache(
        config: Config,
        provider: Arc<dyn Provider>,
        corpus: Arc<dyn CorpusStore>,
        cache: ResultCache<QueryResult>,
    ) -> Result<Self, EngineError> {
        let timeout = config.llm.request_timeout();
        let expander = QueryExpander::new(
            Arc::clone(&provider),
            &config.llm.model,
            config.llm.temperature,
            timeout,
        );
        let embedder = Embedder::new(
            Arc::clone(&provider),
            &config.retrieval.embedding_model,
            timeout,
        );
        let ranker = RetrievalRanker::new(config.retrieval.scoring_threads)?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                provider,
                corpus,
                expander,
                embedder,
                ranker,
                evaluator: Evaluator::default(),
                cache,
                flights: SingleFlight::new(),
                metrics: MetricsTracker::new(),
            }),
        })
    }

    /// Answers a question from the corpus.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Validation`] before any external call, with no side effects
    /// - [`QueryError::Service`] when the corpus, embedding or generation call fails
    /// - [`QueryError::Internal`] if the scoring task dies
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult, QueryError> {
        let started = Instant::now();
        let query = request.validate(&self.inner.config.retrieval)?;
        let key = CacheKey::for_query(
            &query.question,
            query.max_results.get(),
            query.include_metadata,
        );

        if let Some(mut hit) = self.inner.cache.get(key.as_str()).await {
            hit.cached = true;
            hit.response_time_ms = elapsed_ms(started);
            self.inner
                .metrics
                .record_query(hit.response_time_ms as f64, true, false);
            debug!(key = %key, "Served query from cache");
            return Ok(hit);
        }

        let inner = Arc::clone(&self.inner);
        let flight_key = key.clone();
        let outcome = self
            .inner
            .flights
            .run(key.as_str(), move || async move { inner.compute(query, flight_key).await })
            .await;

        let elapsed = elapsed_ms(started);
        match outcome {
            Ok(mut result) => {
                result.response_time_ms = elapsed;
                self.inner
                    .metrics
                    .record_query(elapsed as f64, result.cached, false);
                info!(
                    sources = result.sources.len(),
                    variations = result.variations.len(),
                    cached = result.cached,
                    elapsed_ms = elapsed,
                    "Query answered"
                );
                Ok(result)
            }
            Err(e) => {
                self.inner.metrics.record_query(elapsed as f64, false, true);
                warn!(error = %e, elapsed_ms = elapsed, "Query failed");
                Err(e)
            }
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Drops every cached result.
    pub async fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all().await;
        info!("Result cache invalidated");
    }

    pub async fn health(&self) -> HealthReport {
        let corpus_chunks = match self.inner.corpus.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Corpus unavailable during health check");
                None
            }
        };
        HealthReport {
            status: (if corpus_chunks.is_some() { "ok" } else { "degraded" }).to_string(),
            corpus_chunks,
            cache_entries: self.inner.cache.entry_count().await,
            metrics: self.inner.metrics.snapshot(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl Inner {
    async fn compute(
        self: Arc<Self>,
        query: ValidatedQuery,
        key: CacheKey,
    ) -> Result<QueryResult, QueryError> {
        let started = Instant::now();
        let retrieval = &self.config.retrieval;

        // A previous flight for this key may have finished after our lookup.
        if let Some(mut hit) = self.cache.get(key.as_str()).await {
            hit.cached = true;
            return Ok(hit);
        }

        // Loaded once per query and shared by every variation.
        let corpus = self
            .corpus
            .list_chunks_with_embedding()
            .await
            .map_err(|e| QueryError::service(ServiceStage::Corpus, e))?;
        if corpus.is_empty() {
            info!("Corpus is empty, skipping generation");
            return Ok(self.empty_corpus_result(&query.question));
        }

        let variations = self
            .expander
            .expand(&query.question, retrieval.expansion_count)
            .await
            .into_variations();
        let texts: Vec<String> = variations.iter().map(|v| v.text.clone()).collect();

        let embeddings = self
            .embedder
            .embed_all(&texts, retrieval.embedding_concurrency)
            .await
            .map_err(|e| QueryError::service(ServiceStage::Embedding, e))?;
        let embedded: Vec<EmbeddedVariation> = variations
            .into_iter()
            .zip(embeddings)
            .map(|(variation, embedding)| EmbeddedVariation {
                variation,
                embedding,
            })
            .collect();

        let ranker = self.ranker.clone();
        let max_results = query.max_results;
        let ranking = tokio::task::spawn_blocking(move || ranker.rank(&corpus, &embedded, max_results))
            .await
            .map_err(|e| QueryError::Internal(format!("scoring task failed: {}", e)))?;
        let candidates = match ranking {
            Ranking::EmptyCorpus => return Ok(self.empty_corpus_result(&query.question)),
            Ranking::Ranked(candidates) => candidates,
        };

        let context: Vec<&str> = candidates.iter().map(|c| c.chunk.content.as_str()).collect();
        let request = GenerateRequest::new(
            &self.config.llm.model,
            vec![
                Message::system(&self.config.system_prompt),
                Message::user(answer_prompt(&query.question, &context)),
            ],
        )
        .with_temperature(self.config.llm.temperature);
        let answer = provider::with_deadline(
            self.config.llm.request_timeout(),
            self.provider.generate(request),
        )
        .await
        .map_err(|e| QueryError::service(ServiceStage::Generation, e))?;

        let evaluation = self
            .evaluator
            .evaluate(&query.question, &answer, &context, None);
        let sources = candidates
            .iter()
            .map(|c| Source::from_candidate(c, retrieval.source_preview_chars, query.include_metadata))
            .collect();

        let result = QueryResult {
            answer,
            sources,
            variations: texts,
            evaluation,
            response_time_ms: elapsed_ms(started),
            cached: false,
        };
        self.cache
            .put(key.into_string(), result.clone(), Some(self.config.cache.query_ttl()))
            .await;
        Ok(result)
    }

    fn empty_corpus_result(&self, question: &str) -> QueryResult {
        let evaluation = self
            .evaluator
            .evaluate(question, EMPTY_CORPUS_ANSWER, &[], None);
        QueryResult::empty_corpus(question, evaluation)
    }
}

fn answer_prompt(question: &str, context: &[&str]) -> String {
    let mut prompt = String::from("Context:\n");
    for (i, chunk) in context.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, chunk));
    }
    prompt.push_str(&format!("\nQuestion: {}\n\nAnswer:", question));
    prompt
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
