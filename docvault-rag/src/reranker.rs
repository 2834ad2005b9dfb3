//! Reranker trait for re-scoring query hits with a cross-encoder.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::document::QueryHit;
use crate::error::{RagError, Result};

/// A pairwise (query, candidate) relevance model.
///
/// Implementors only provide [`score`](Reranker::score); the provided
/// [`rerank`](Reranker::rerank) attaches the scores to the hits, orders them
/// by descending score and truncates.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each candidate text against the query. The returned vector is
    /// parallel to `candidates`; higher is more relevant.
    async fn score(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>>;

    /// Short backend name used in errors and logs.
    fn name(&self) -> &str {
        "reranker"
    }

    /// Rerank hits against the query and keep the best `top_n`.
    ///
    /// Every hit moves as a whole record, so ids, texts, metadata and
    /// distances stay aligned with their scores.
    async fn rerank(
        &self,
        query: &str,
        hits: Vec<QueryHit>,
        top_n: usize,
    ) -> Result<Vec<QueryHit>> {
        if hits.is_empty() {
            return Ok(hits);
        }

        let candidates: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        let scores = self.score(query, &candidates).await?;
        if scores.len() != hits.len() {
            return Err(RagError::RerankerError {
                reranker: self.name().to_string(),
                message: format!("expected {} scores, got {}", hits.len(), scores.len()),
            });
        }

        let mut scored: Vec<QueryHit> = hits
            .into_iter()
            .zip(scores)
            .map(|(hit, score)| QueryHit { rerank_score: Some(score), ..hit })
            .collect();

        scored.sort_by(|a, b| {
            b.rerank_score.partial_cmp(&a.rerank_score).unwrap_or(Ordering::Equal)
        });
        scored.truncate(top_n);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    /// Scores a candidate by its length.
    struct LengthReranker;

    #[async_trait]
    impl Reranker for LengthReranker {
        async fn score(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
            Ok(candidates.iter().map(|c| c.len() as f32).collect())
        }
    }

    fn hit(id: &str, text: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
            distance,
            rerank_score: None,
        }
    }

    #[tokio::test]
    async fn rerank_sorts_whole_records_and_truncates() {
        let hits = vec![hit("a", "x", 0.1), hit("b", "xxx", 0.2), hit("c", "xx", 0.3)];
        let reranked = LengthReranker.rerank("q", hits, 2).await.unwrap();

        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].id, "b");
        assert_eq!(reranked[0].distance, 0.2);
        assert_eq!(reranked[0].rerank_score, Some(3.0));
        assert_eq!(reranked[1].id, "c");
        assert_eq!(reranked[1].distance, 0.3);
    }
}
