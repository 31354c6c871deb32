//! Fan-out ranking of query variations over the corpus.
//!
//! Every (variation, chunk) pair is scored, candidates are deduplicated by
//! chunk id keeping the best hybrid score, and the top results are returned
//! in non-increasing score order.

use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::scoring::{query_terms, Scores, ScoringEngine};
use super::types::{Chunk, QueryVariation, ScoredCandidate};
use crate::engine::ValidationError;

/// Largest accepted `max_results`.
pub const MAX_RESULTS_LIMIT: usize = 20;

/// A requested result count, guaranteed to lie in `1..=MAX_RESULTS_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaxResults(usize);

impl MaxResults {
    /// Rejects values outside the accepted range instead of clamping them.
    pub fn new(value: usize) -> Result<Self, ValidationError> {
        if (1..=MAX_RESULTS_LIMIT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::MaxResultsOutOfRange {
                value,
                max: MAX_RESULTS_LIMIT,
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum RankerError {
    #[error("Failed to build scoring pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A query variation together with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedVariation {
    pub variation: QueryVariation,
    pub embedding: Vec<f32>,
}

/// Result of a ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    /// The corpus had no chunks; callers should not generate an answer.
    EmptyCorpus,
    Ranked(Vec<ScoredCandidate>),
}

impl Ranking {
    pub fn candidates(&self) -> &[ScoredCandidate] {
        match self {
            Self::EmptyCorpus => &[],
            Self::Ranked(candidates) => candidates,
        }
    }
}

/// Scores and ranks chunks on a dedicated, bounded worker pool.
#[derive(Clone)]
pub struct RetrievalRanker {
    pool: Arc<rayon::ThreadPool>,
}

impl RetrievalRanker {
    /// Builds a ranker with `threads` scoring workers (0 = one per CPU).
    pub fn new(threads: usize) -> Result<Self, RankerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sift-score-{}", i))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Ranks `corpus` against every variation.
    ///
    /// Ties keep corpus order. For a chunk scored equally by two variations,
    /// the earlier variation is kept.
    pub fn rank(
        &self,
        corpus: &[Chunk],
        variations: &[EmbeddedVariation],
        max_results: MaxResults,
    ) -> Ranking {
        if corpus.is_empty() {
            return Ranking::EmptyCorpus;
        }

        let engine = ScoringEngine::new(corpus);

        // Position of the first chunk carrying each id.
        let mut slot_of_id: HashMap<&str, usize> = HashMap::new();
        let slots: Vec<usize> = corpus
            .iter()
            .map(|chunk| {
                let next = slot_of_id.len();
                *slot_of_id.entry(chunk.id.as_str()).or_insert(next)
            })
            .collect();
        // Per id: (corpus position, scores, variation position) of the best pair.
        let mut best: Vec<Option<(usize, Scores, usize)>> = vec![None; slot_of_id.len()];

        for (var_idx, embedded) in variations.iter().enumerate() {
            let terms = query_terms(&embedded.variation.text);
            let scores: Vec<Scores> = self.pool.install(|| {
                corpus
                    .par_iter()
                    .enumerate()
                    .map(|(idx, chunk)| engine.score(idx, chunk, &embedded.embedding, &terms))
                    .collect()
            });

            for (idx, score) in scores.into_iter().enumerate() {
                let slot = &mut best[slots[idx]];
                let better = match slot {
                    Some((_, current, _)) => score.hybrid > current.hybrid,
                    None => true,
                };
                if better {
                    *slot = Some((idx, score, var_idx));
                }
            }
        }

        let mut winners: Vec<(usize, Scores, usize)> = best.into_iter().flatten().collect();
        winners.sort_by(|a, b| b.1.hybrid.total_cmp(&a.1.hybrid));
        winners.truncate(max_results.get());

        let ranked: Vec<ScoredCandidate> = winners
            .into_iter()
            .map(|(idx, score, var_idx)| ScoredCandidate {
                chunk: corpus[idx].clone(),
                vector_score: score.vector,
                bm25_score: score.bm25,
                hybrid_score: score.hybrid,
                variation: variations[var_idx].variation.clone(),
            })
            .collect();

        debug!(
            corpus = corpus.len(),
            variations = variations.len(),
            returned = ranked.len(),
            "Ranked candidates"
        );
        Ranking::Ranked(ranked)
    }
}
