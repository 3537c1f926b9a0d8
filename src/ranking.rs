//! Similarity ranking over stored chunks.
//!
//! Pure computation: no I/O, no mutation. Scores are cosine similarities in
//! [-1, 1]; ties keep the order candidates were passed in.

use crate::chunk_store::Chunk;

/// A ranked chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    /// Text content of the chunk.
    pub text: String,
    /// Cosine similarity against the query.
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Mismatched lengths, empty vectors, and zero-norm vectors score 0.0 rather
/// than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank candidates against a query embedding, best first.
///
/// Returns at most `top_k` results; an empty candidate set produces an empty
/// result. The sort is stable, so equal scores preserve candidate order.
pub fn rank(query: &[f32], candidates: &[Chunk], top_k: usize) -> Vec<RankedChunk> {
    let mut results: Vec<RankedChunk> = candidates
        .iter()
        .map(|chunk| RankedChunk {
            text: chunk.text.clone(),
            score: cosine_similarity(query, &chunk.embedding),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new("alice".to_string(), "chat1".to_string(), text.to_string(), embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_self_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_sorted_descending() {
        let candidates = vec![
            chunk("low", vec![0.0, 1.0]),
            chunk("high", vec![1.0, 0.0]),
            chunk("mid", vec![1.0, 1.0]),
        ];

        let ranked = rank(&[1.0, 0.0], &candidates, 10);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].text, "high");
        assert_eq!(ranked[1].text, "mid");
        assert_eq!(ranked[2].text, "low");
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_rank_truncates_to_top_k() {
        let candidates: Vec<Chunk> = (0..10)
            .map(|i| chunk(&format!("c{}", i), vec![i as f32, 1.0]))
            .collect();

        assert_eq!(rank(&[1.0, 0.0], &candidates, 3).len(), 3);
        assert_eq!(rank(&[1.0, 0.0], &candidates, 10).len(), 10);
        assert_eq!(rank(&[1.0, 0.0], &candidates, 25).len(), 10);
    }

    #[test]
    fn test_rank_empty_candidates() {
        let ranked = rank(&[1.0, 0.0], &[], 5);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_ties_keep_candidate_order() {
        let candidates = vec![
            chunk("first", vec![2.0, 0.0]),
            chunk("second", vec![3.0, 0.0]),
            chunk("third", vec![1.0, 0.0]),
        ];

        // All three are colinear with the query: identical scores.
        let ranked = rank(&[1.0, 0.0], &candidates, 3);
        let texts: Vec<&str> = ranked.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_zero_norm_candidate_scores_zero() {
        let candidates = vec![
            chunk("zero", vec![0.0, 0.0]),
            chunk("aligned", vec![1.0, 0.0]),
        ];

        let ranked = rank(&[1.0, 0.0], &candidates, 2);
        assert_eq!(ranked[0].text, "aligned");
        assert_eq!(ranked[1].text, "zero");
        assert_eq!(ranked[1].score, 0.0);
    }
}
