//! Answer quality scoring.
//!
//! Scores are lexical approximations: token-set overlap stands in for
//! semantic similarity. The overlap measure is pluggable through
//! [`Similarity`] so an embedding-based measure can replace it.

use serde::{Deserialize, Serialize};

use crate::text::{jaccard, split_sentences, token_set};

/// A retrieved chunk counts as precise above this overlap with a reference.
pub const CONTEXT_PRECISION_THRESHOLD: f64 = 0.5;
/// An answer sentence counts as supported above this overlap with the context.
pub const FAITHFULNESS_THRESHOLD: f64 = 0.3;
/// Context precision reported when there is nothing to compare against.
pub const NEUTRAL_PRECISION: f64 = 0.5;

/// Pairwise text similarity in [0, 1].
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Jaccard similarity of lowercase token sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlap;

impl Similarity for TokenOverlap {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        jaccard(&token_set(a), &token_set(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub answer_relevance: f64,
    pub context_precision: f64,
    pub faithfulness: f64,
}

/// Scores a generated answer against its question and retrieved context.
pub struct Evaluator<S = TokenOverlap> {
    similarity: S,
}

impl Default for Evaluator<TokenOverlap> {
    fn default() -> Self {
        Self::new(TokenOverlap)
    }
}

impl<S: Similarity> Evaluator<S> {
    pub fn new(similarity: S) -> Self {
        Self { similarity }
    }

    /// Computes all three scores.
    ///
    /// `reference` is an optional set of chunk texts known to be relevant;
    /// without it context precision is [`NEUTRAL_PRECISION`].
    pub fn evaluate(
        &self,
        question: &str,
        answer: &str,
        context: &[&str],
        reference: Option<&[&str]>,
    ) -> EvaluationScores {
        EvaluationScores {
            answer_relevance: self.answer_relevance(question, answer),
            context_precision: self.context_precision(context, reference),
            faithfulness: self.faithfulness(answer, context),
        }
    }

    pub fn answer_relevance(&self, question: &str, answer: &str) -> f64 {
        self.similarity.similarity(question, answer)
    }

    pub fn context_precision(&self, context: &[&str], reference: Option<&[&str]>) -> f64 {
        let Some(reference) = reference.filter(|r| !r.is_empty()) else {
            return NEUTRAL_PRECISION;
        };
        if context.is_empty() {
            return NEUTRAL_PRECISION;
        }

        let precise = context
            .iter()
            .filter(|chunk| {
                reference
                    .iter()
                    .any(|r| self.similarity.similarity(chunk, r) > CONTEXT_PRECISION_THRESHOLD)
            })
            .count();
        precise as f64 / context.len() as f64
    }

    /// Fraction of answer sentences supported by the concatenated context.
    ///
    /// An answer with no sentences is fully faithful.
    pub fn faithfulness(&self, answer: &str, context: &[&str]) -> f64 {
        let sentences = split_sentences(answer);
        if sentences.is_empty() {
            return 1.0;
        }

        let joined = context.join(" ");
        let supported = sentences
            .iter()
            .filter(|sentence| self.similarity.similarity(sentence, &joined) > FAITHFULNESS_THRESHOLD)
            .count();
        supported as f64 / sentences.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_relevance_is_token_jaccard() {
        let evaluator = Evaluator::default();
        assert_eq!(evaluator.answer_relevance("cats purr", "cats purr"), 1.0);
        assert_eq!(evaluator.answer_relevance("cats purr", "dogs bark"), 0.0);
        assert!((evaluator.answer_relevance("Cats purr", "cats sleep") - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_both_empty_texts_are_fully_relevant() {
        assert_eq!(Evaluator::default().answer_relevance("", "?!"), 1.0);
    }

    #[test]
    fn test_context_precision_without_reference_is_neutral() {
        let evaluator = Evaluator::default();
        assert_eq!(evaluator.context_precision(&["a b"], None), NEUTRAL_PRECISION);
        assert_eq!(evaluator.context_precision(&["a b"], Some(&[][..])), NEUTRAL_PRECISION);
        assert_eq!(evaluator.context_precision(&[], Some(&["a b"][..])), NEUTRAL_PRECISION);
    }

    #[test]
    fn test_context_precision_counts_overlapping_chunks() {
        let evaluator = Evaluator::default();
        let context = ["cats are small pets", "cars need fuel"];
        let reference = ["cats are small pets indeed"];
        assert_eq!(evaluator.context_precision(&context, Some(&reference[..])), 0.5);
    }

    #[test]
    fn test_faithfulness_counts_supported_sentences() {
        let evaluator = Evaluator::default();
        let context = ["cats purr", "dogs bark"];
        let answer = "Cats purr. Rockets launch into orbit at high speed.";
        assert_eq!(evaluator.faithfulness(answer, &context), 0.5);
    }

    #[test]
    fn test_empty_answer_is_fully_faithful() {
        assert_eq!(Evaluator::default().faithfulness("   ", &["ctx"]), 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let scores = Evaluator::default().evaluate(
            "Tell me about pets",
            "Cats and dogs are common pets. They live with people.",
            &["Cats are small pets", "Dogs are loyal pets"],
            None,
        );
        for score in [scores.answer_relevance, scores.context_precision, scores.faithfulness] {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    struct Always(f64);

    impl Similarity for Always {
        fn similarity(&self, _a: &str, _b: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_similarity_is_pluggable() {
        let evaluator = Evaluator::new(Always(0.9));
        let scores = evaluator.evaluate("q", "One. Two.", &["c"], Some(&["r"][..]));
        assert_eq!(scores.answer_relevance, 0.9);
        assert_eq!(scores.context_precision, 1.0);
        assert_eq!(scores.faithfulness, 1.0);
    }
}
