//! Lexical, semantic and hybrid relevance scoring.
//!
//! All functions here are pure. BM25 needs corpus-wide statistics, which are
//! computed once per query into a [`ScoringEngine`] and then shared read-only
//! across scoring workers.

use std::collections::HashMap;

use super::types::Chunk;
use crate::text::tokenize;

pub const BM25_K1: f64 = 1.2;
pub const BM25_B: f64 = 0.75;
pub const VECTOR_WEIGHT: f64 = 0.7;
pub const BM25_WEIGHT: f64 = 0.3;

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for empty or mismatched vectors and for
/// vectors with zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f64;
    let mut magnitude_a = 0.0f64;
    let mut magnitude_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot_product += x * y;
        magnitude_a += x * x;
        magnitude_b += y * y;
    }

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (magnitude_a.sqrt() * magnitude_b.sqrt());
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Fixed linear blend of semantic and lexical relevance.
pub fn hybrid_score(vector_score: f64, bm25_score: f64) -> f64 {
    VECTOR_WEIGHT * vector_score + BM25_WEIGHT * bm25_score
}

/// Inverse document frequency, floored at zero.
///
/// Terms present in more than half of the corpus would otherwise get a
/// negative weight.
pub fn bm25_idf(total_docs: usize, doc_freq: usize) -> f64 {
    if doc_freq == 0 {
        return 0.0;
    }
    let n = total_docs as f64;
    let df = doc_freq as f64;
    ((n - df + 0.5) / (df + 0.5)).ln().max(0.0)
}

/// Per-document term statistics.
#[derive(Debug, Clone, Default)]
struct DocTerms {
    term_freq: HashMap<String, usize>,
    len: usize,
}

impl DocTerms {
    fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        let len = tokens.len();
        let mut term_freq = HashMap::new();
        for token in tokens {
            *term_freq.entry(token).or_insert(0) += 1;
        }
        Self { term_freq, len }
    }
}

/// Corpus statistics snapshot for BM25.
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    docs: Vec<DocTerms>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
}

impl CorpusStats {
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let docs: Vec<DocTerms> = texts.into_iter().map(DocTerms::from_text).collect();
        let mut doc_freq = HashMap::new();
        let mut total_len = 0usize;
        for doc in &docs {
            total_len += doc.len;
            for term in doc.term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };
        Self {
            docs,
            doc_freq,
            avg_len,
        }
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    /// BM25 score of document `idx` for the given (distinct) query terms.
    pub fn bm25(&self, idx: usize, query_terms: &[String]) -> f64 {
        let Some(doc) = self.docs.get(idx) else {
            return 0.0;
        };
        if doc.len == 0 || self.avg_len <= 0.0 {
            return 0.0;
        }

        let dl = doc.len as f64;
        let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * dl / self.avg_len);
        let mut score = 0.0;

        for term in query_terms {
            let freq = doc.term_freq.get(term).copied().unwrap_or(0) as f64;
            if freq == 0.0 {
                continue;
            }
            let idf = bm25_idf(self.docs.len(), self.doc_freq(term));
            score += idf * (freq * (BM25_K1 + 1.0)) / (freq + norm);
        }

        score
    }
}

/// Distinct query terms in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// BM25 score of `text` against `corpus` for `query`.
///
/// Builds fresh statistics on every call; the ranker uses a shared
/// [`ScoringEngine`] instead.
pub fn bm25_score(query: &str, text: &str, corpus: &[&str]) -> f64 {
    let mut texts = corpus.to_vec();
    let idx = match corpus.iter().position(|t| *t == text) {
        Some(idx) => idx,
        None => {
            texts.push(text);
            texts.len() - 1
        }
    };
    CorpusStats::from_texts(texts).bm25(idx, &query_terms(query))
}

/// Scores of one chunk against one query variation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub vector: f64,
    pub bm25: f64,
    pub hybrid: f64,
}

/// Scores chunks of a fixed corpus against query variations.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    stats: CorpusStats,
}

impl ScoringEngine {
    pub fn new(corpus: &[Chunk]) -> Self {
        Self {
            stats: CorpusStats::from_texts(corpus.iter().map(|c| c.content.as_str())),
        }
    }

    /// Scores the chunk at corpus position `idx`.
    pub fn score(
        &self,
        idx: usize,
        chunk: &Chunk,
        query_embedding: &[f32],
        query_terms: &[String],
    ) -> Scores {
        let vector = cosine_similarity(query_embedding, &chunk.embedding);
        let bm25 = self.stats.bm25(idx, query_terms);
        Scores {
            vector,
            bm25,
            hybrid: hybrid_score(vector, bm25),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn test_cosine_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.5, 0.1, -0.7];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_hybrid_score_weights() {
        assert_eq!(hybrid_score(0.5, 2.0), 0.7 * 0.5 + 0.3 * 2.0);
        assert_eq!(hybrid_score(0.0, 0.0), 0.0);
        assert!((hybrid_score(1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_idf_zero_document_frequency_contributes_nothing() {
        assert_eq!(bm25_idf(10, 0), 0.0);
        assert!(bm25_idf(10, 1) > 0.0);
        assert_eq!(bm25_idf(2, 2), 0.0);
    }

    #[test]
    fn test_bm25_prefers_matching_document() {
        let corpus = ["cats purr and cats sleep", "dogs bark loudly", "cars need fuel"];
        let cat = bm25_score("cats", corpus[0], &corpus);
        let dog = bm25_score("cats", corpus[1], &corpus);
        assert!(cat > 0.0);
        assert_eq!(dog, 0.0);
    }

    #[test]
    fn test_bm25_absent_term_contributes_zero() {
        let corpus = ["alpha beta", "gamma delta"];
        assert_eq!(bm25_score("zeta", corpus[0], &corpus), 0.0);
        assert_eq!(
            bm25_score("alpha zeta", corpus[0], &corpus),
            bm25_score("alpha", corpus[0], &corpus)
        );
    }

    #[test]
    fn test_bm25_length_normalization() {
        let corpus = [
            "rust",
            "rust is a language with many many many many words in it",
            "python",
            "java",
            "go",
        ];
        let short = bm25_score("rust", corpus[0], &corpus);
        let long = bm25_score("rust", corpus[1], &corpus);
        assert!(short > long);
    }

    #[test]
    fn test_bm25_empty_corpus_text_is_zero() {
        let corpus = ["", ""];
        assert_eq!(bm25_score("anything", corpus[0], &corpus), 0.0);
    }

    #[test]
    fn test_scoring_engine_combines_scores() {
        let corpus = vec![
            Chunk::new("a", "d", 0, "cats purr", vec![1.0, 0.0]),
            Chunk::new("b", "d", 1, "cars honk", vec![0.0, 1.0]),
            Chunk::new("c", "d", 2, "dogs bark", vec![0.5, 0.5]),
        ];
        let engine = ScoringEngine::new(&corpus);
        let terms = query_terms("cats");
        let scores = engine.score(0, &corpus[0], &[1.0, 0.0], &terms);
        assert_eq!(scores.vector, 1.0);
        assert!(scores.bm25 > 0.0);
        assert_eq!(scores.hybrid, hybrid_score(scores.vector, scores.bm25));
    }

    #[test]
    fn test_query_terms_are_distinct() {
        assert_eq!(query_terms("Cats cats DOGS"), vec!["cats", "dogs"]);
    }
}
