use proptest::prelude::*;
use sift_core::retrieval::scoring::{bm25_score, cosine_similarity, hybrid_score};
use sift_core::retrieval::{
    Chunk, EmbeddedVariation, MaxResults, QueryVariation, RetrievalRanker,
};
use std::collections::HashSet;

const WORDS: &[&str] = &["cat", "dog", "car", "fuel", "pet", "purr", "bark", "road"];

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 1..8).prop_map(|words| words.join(" "))
}

fn embedding_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, 3)
}

fn corpus_strategy() -> impl Strategy<Value = Vec<Chunk>> {
    prop::collection::vec((0..6usize, text_strategy(), embedding_strategy()), 0..24).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (id, text, embedding))| {
                    Chunk::new(format!("chunk-{}", id), "doc", i, text, embedding)
                })
                .collect()
        },
    )
}

fn variations_strategy() -> impl Strategy<Value = Vec<EmbeddedVariation>> {
    prop::collection::vec((text_strategy(), embedding_strategy()), 1..4).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (text, embedding))| EmbeddedVariation {
                variation: QueryVariation::new(i, text),
                embedding,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_ranker_bounded_unique_and_sorted(
        corpus in corpus_strategy(),
        variations in variations_strategy(),
        max in 1usize..=20,
    ) {
        let ranker = RetrievalRanker::new(2).unwrap();
        let ranking = ranker.rank(&corpus, &variations, MaxResults::new(max).unwrap());
        let candidates = ranking.candidates();

        prop_assert!(candidates.len() <= max);

        let ids: HashSet<&str> = candidates.iter().map(|c| c.chunk.id.as_str()).collect();
        prop_assert_eq!(ids.len(), candidates.len());

        for window in candidates.windows(2) {
            prop_assert!(window[0].hybrid_score >= window[1].hybrid_score);
        }

        let distinct: HashSet<&str> = corpus.iter().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(candidates.len(), distinct.len().min(max));
    }

    #[test]
    fn prop_cosine_symmetric_and_bounded(a in embedding_strategy(), b in embedding_strategy()) {
        let ab = cosine_similarity(&a, &b);
        prop_assert_eq!(ab, cosine_similarity(&b, &a));
        prop_assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn prop_cosine_mismatched_length_is_zero(
        a in prop::collection::vec(-1.0f32..1.0, 1..5),
        b in prop::collection::vec(-1.0f32..1.0, 6..9),
    ) {
        prop_assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn prop_bm25_non_negative(
        texts in prop::collection::vec(text_strategy(), 1..10),
        query in text_strategy(),
    ) {
        let corpus: Vec<&str> = texts.iter().map(String::as_str).collect();
        for text in &corpus {
            prop_assert!(bm25_score(&query, text, &corpus) >= 0.0);
        }
    }

    #[test]
    fn prop_hybrid_is_fixed_blend(vector in -1.0f64..1.0, bm25 in 0.0f64..50.0) {
        prop_assert_eq!(hybrid_score(vector, bm25), 0.7 * vector + 0.3 * bm25);
    }
}
