use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::config::RetrievalConfig;
use crate::evaluation::EvaluationScores;
use crate::retrieval::{MaxResults, ScoredCandidate};
use crate::text::truncate_chars;

/// A question submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub include_metadata: bool,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            include_metadata: false,
            max_results: None,
        }
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Checks the request against the configured limits.
    ///
    /// Length is measured in characters after trimming.
    pub fn validate(&self, limits: &RetrievalConfig) -> Result<ValidatedQuery, ValidationError> {
        let question = self.question.trim();
        let len = question.chars().count();
        if len < limits.min_question_chars {
            return Err(ValidationError::QuestionTooShort {
                len,
                min: limits.min_question_chars,
            });
        }
        if len > limits.max_question_chars {
            return Err(ValidationError::QuestionTooLong {
                len,
                max: limits.max_question_chars,
            });
        }
        let max_results = MaxResults::new(self.max_results.unwrap_or(limits.default_max_results))?;

        Ok(ValidatedQuery {
            question: question.to_string(),
            include_metadata: self.include_metadata,
            max_results,
        })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub question: String,
    pub include_metadata: bool,
    pub max_results: MaxResults,
}

/// Chunk details included only when metadata is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub doc_id: String,
    pub chunk_index: usize,
    pub word_count: usize,
    /// The phrasing that produced this source's best score.
    pub matched_variation: String,
}

/// One ranked source in a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub chunk_id: String,
    /// Content preview.
    pub content: String,
    pub vector_score: f64,
    pub bm25_score: f64,
    pub hybrid_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SourceMetadata>,
}

impl Source {
    pub(crate) fn from_candidate(
        candidate: &ScoredCandidate,
        preview_chars: usize,
        include_metadata: bool,
    ) -> Self {
        let metadata = include_metadata.then(|| SourceMetadata {
            doc_id: candidate.chunk.doc_id.clone(),
            chunk_index: candidate.chunk.chunk_index,
            word_count: candidate.chunk.word_count,
            matched_variation: candidate.variation.text.clone(),
        });
        Self {
            chunk_id: candidate.chunk.id.clone(),
            content: truncate_chars(&candidate.chunk.content, preview_chars),
            vector_score: candidate.vector_score,
            bm25_score: candidate.bm25_score,
            hybrid_score: candidate.hybrid_score,
            metadata,
        }
    }
}

/// Outcome of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Source>,
    /// Phrasings used, the original question first.
    pub variations: Vec<String>,
    pub evaluation: EvaluationScores,
    pub response_time_ms: u64,
    pub cached: bool,
}

/// Answer returned when the corpus holds no chunks.
pub const EMPTY_CORPUS_ANSWER: &str =
    "No documents have been uploaded yet. Upload documents before asking questions.";

impl QueryResult {
    pub(crate) fn empty_corpus(question: &str, evaluation: EvaluationScores) -> Self {
        Self {
            answer: EMPTY_CORPUS_ANSWER.to_string(),
            sources: Vec::new(),
            variations: vec![question.to_string()],
            evaluation,
            response_time_ms: 0,
            cached: false,
        }
    }
}
