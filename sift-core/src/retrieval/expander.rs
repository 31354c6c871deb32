//! Query expansion through the generation service.
//!
//! Alternative phrasings widen lexical and semantic recall. Expansion is
//! best-effort: any failure degrades to the original question alone.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::QueryVariation;
use crate::provider::{self, GenerateRequest, Provider};

pub const DEFAULT_EXPANSION_COUNT: usize = 3;

/// Outcome of expanding a question.
///
/// Both variants start with the original question at index 0.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// The generator answered; holds the original plus whatever was parsed.
    Full(Vec<QueryVariation>),
    /// The generator failed; only the original question survives.
    Degraded {
        variations: Vec<QueryVariation>,
        reason: String,
    },
}

impl Expansion {
    fn degraded(question: &str, reason: impl Into<String>) -> Self {
        Self::Degraded {
            variations: vec![QueryVariation::new(0, question)],
            reason: reason.into(),
        }
    }

    pub fn variations(&self) -> &[QueryVariation] {
        match self {
            Self::Full(variations) => variations,
            Self::Degraded { variations, .. } => variations,
        }
    }

    pub fn into_variations(self) -> Vec<QueryVariation> {
        match self {
            Self::Full(variations) => variations,
            Self::Degraded { variations, .. } => variations,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Produces alternative phrasings of a question.
#[derive(Clone)]
pub struct QueryExpander {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl QueryExpander {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            timeout,
        }
    }

    /// Returns the original question followed by up to `count` alternatives.
    ///
    /// Never fails. A generator error or timeout is logged and yields
    /// [`Expansion::Degraded`]; no retry is attempted.
    pub async fn expand(&self, question: &str, count: usize) -> Expansion {
        if count == 0 {
            return Expansion::Full(vec![QueryVariation::new(0, question)]);
        }

        let request = GenerateRequest::prompt(&self.model, expansion_prompt(question, count))
            .with_temperature(self.temperature);

        match provider::with_deadline(self.timeout, self.provider.generate(request)).await {
            Ok(output) => {
                let mut variations = vec![QueryVariation::new(0, question)];
                variations.extend(
                    parse_variations(&output, count)
                        .into_iter()
                        .enumerate()
                        .map(|(i, text)| QueryVariation::new(i + 1, text)),
                );
                debug!(requested = count, produced = variations.len() - 1, "Expanded question");
                Expansion::Full(variations)
            }
            Err(e) => {
                warn!(error = %e, "Query expansion failed, using original question only");
                Expansion::degraded(question, e.to_string())
            }
        }
    }
}

fn expansion_prompt(question: &str, count: usize) -> String {
    format!(
        "Generate {count} alternative phrasings of the following question. \
         Keep the original meaning but vary the wording and vocabulary. \
         Return only the questions, one per line.\n\nQuestion: {question}"
    )
}

fn enumeration_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^(?:\(?\d+[.):\]](?:\s+|$)|(?:[-*•]|#+)\s*)+").expect("enumeration marker regex is valid")
    })
}

/// Splits generator output into at most `count` clean phrasings.
///
/// Leading enumeration markers (`1.`, `2)`, `(3)`, `-`, `*`) are stripped and
/// blank lines discarded.
pub fn parse_variations(output: &str, count: usize) -> Vec<String> {
    output
        .lines()
        .map(|line| enumeration_marker().replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(count)
        .collect()
}
