use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::retrieval::RankerError;

/// A request rejected before any external call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Question is too short: {len} characters, minimum is {min}")]
    QuestionTooShort { len: usize, min: usize },

    #[error("Question is too long: {len} characters, maximum is {max}")]
    QuestionTooLong { len: usize, max: usize },

    #[error("max_results must be between 1 and {max}, got {value}")]
    MaxResultsOutOfRange { value: usize, max: usize },
}

/// Pipeline stage in which an external service failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStage {
    Corpus,
    Embedding,
    Generation,
}

impl fmt::Display for ServiceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Corpus => "corpus",
            Self::Embedding => "embedding",
            Self::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Failure of a query as seen by callers.
///
/// Cloneable so one computation's failure can be handed to every caller
/// waiting on it. Carries diagnostic text only, never source chains.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("{stage} service failed: {message}")]
    Service { stage: ServiceStage, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub(crate) fn service(stage: ServiceStage, err: impl fmt::Display) -> Self {
        Self::Service {
            stage,
            message: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Failure to construct a [`QueryEngine`](super::QueryEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to build ranker: {0}")]
    Ranker(#[from] RankerError),
}
