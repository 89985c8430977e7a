//! Text-to-image ranking over the shared snapshot
//!
//! A query is embedded with the text tower, normalized, and compared against
//! every stored vector by dot product (cosine similarity for unit vectors).
//! Similarities are mapped to a 0..=100 score and sorted stably, so equal
//! scores keep snapshot order.

mod pagination;

pub use pagination::{paginate, Page};

use crate::embedding::{dot, normalized, Embedder, EmbeddingError};
use crate::error::Result;
use crate::storage::{read_snapshot, SharedSnapshot};
use serde::Serialize;
use std::sync::Arc;

/// Number of results fetched before pagination
pub const DEFAULT_FETCH_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,
    /// Relevance in `0.0..=100.0`
    pub score: f32,
}

/// Map a cosine similarity onto `0.0..=100.0`
pub fn score_from_similarity(similarity: f32) -> f32 {
    (similarity.clamp(-1.0, 1.0) + 1.0) * 50.0
}

#[derive(Clone)]
pub struct Searcher {
    embedder: Arc<dyn Embedder>,
    snapshot: SharedSnapshot,
}

impl Searcher {
    pub fn new(embedder: Arc<dyn Embedder>, snapshot: SharedSnapshot) -> Self {
        Self { embedder, snapshot }
    }

    /// Best `top_k` matches for `query`, highest score first.
    ///
    /// A blank query matches nothing. Failing to embed the query, or a query
    /// vector of another dimension than the index, is an error.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let raw = self.embedder.embed_text(query)?;
        let query_vector = normalized(&raw)?;

        let hits = {
            let snapshot = read_snapshot(&self.snapshot);
            if let Some(dimension) = snapshot.dimension() {
                if dimension != query_vector.len() {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: dimension,
                        actual: query_vector.len(),
                    }
                    .into());
                }
            }

            rank(
                snapshot
                    .iter()
                    .map(|entry| (entry.path.as_str(), dot(&query_vector, &entry.vector))),
                top_k,
            )
        };

        tracing::debug!("Query {:?} matched {} results", query, hits.len());
        Ok(hits)
    }

    /// Fetch up to `fetch_limit` results and slice out one page
    pub fn search_page(
        &self,
        query: &str,
        fetch_limit: usize,
        page: usize,
        per_page: usize,
    ) -> Result<Page> {
        let results = self.search(query, fetch_limit)?;
        Ok(paginate(&results, page, per_page))
    }
}

/// Score, stable-sort and truncate `(path, similarity)` pairs
pub fn rank<'a, I>(similarities: I, top_k: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = (&'a str, f32)>,
{
    let mut hits: Vec<SearchHit> = similarities
        .into_iter()
        .map(|(path, similarity)| SearchHit {
            path: path.to_string(),
            score: score_from_similarity(similarity),
        })
        .collect();

    // sort_by is stable; NaN compares equal and keeps its place
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared, IndexEntry, IndexSnapshot};
    use image::DynamicImage;

    /// Text "x" points along the first axis, anything else along the second
    struct AxisText;

    impl Embedder for AxisText {
        fn embed_image(
            &self,
            _image: &DynamicImage,
        ) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::InvalidInput("text only".to_string()))
        }

        fn embed_text(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Ok(if text == "x" {
                vec![2.0, 0.0]
            } else {
                vec![0.0, 3.0]
            })
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    fn searcher(entries: &[(&str, [f32; 2])]) -> Searcher {
        let mut snapshot = IndexSnapshot::new();
        for (path, vector) in entries {
            snapshot
                .insert(IndexEntry {
                    path: path.to_string(),
                    vector: vector.to_vec(),
                    modified: None,
                })
                .unwrap();
        }
        Searcher::new(Arc::new(AxisText), shared(snapshot))
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!((actual - expected).abs() < 1e-4, "{} != {}", actual, expected);
    }

    #[test]
    fn test_score_mapping() {
        assert_close(score_from_similarity(1.0), 100.0);
        assert_close(score_from_similarity(0.0), 50.0);
        assert_close(score_from_similarity(-1.0), 0.0);
        assert_close(score_from_similarity(1.5), 100.0);
        assert_close(score_from_similarity(-3.0), 0.0);
    }

    #[test]
    fn test_score_is_monotonic() {
        let mut previous = score_from_similarity(-1.0);
        for step in 1..=200 {
            let score = score_from_similarity(-1.0 + step as f32 * 0.01);
            assert!(score >= previous);
            assert!((0.0..=100.0).contains(&score));
            previous = score;
        }
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let hits = rank(vec![("neg", -0.5), ("high", 0.9), ("zero", 0.0)], 10);
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["high", "zero", "neg"]);
        assert_close(hits[0].score, 95.0);
        assert_close(hits[1].score, 50.0);
        assert_close(hits[2].score, 25.0);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let hits = rank(vec![("b", 0.3), ("a", 0.3), ("c", 0.3)], 2);
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["b", "a"]);
    }

    #[test]
    fn test_search_ranks_snapshot() {
        let searcher = searcher(&[
            ("a.jpg", [0.0, 1.0]),
            ("b.jpg", [1.0, 0.0]),
            ("c.jpg", [0.6, 0.8]),
        ]);

        let hits = searcher.search("x", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "b.jpg");
        assert_close(hits[0].score, 100.0);
        assert_eq!(hits[1].path, "c.jpg");
        assert_close(hits[1].score, 80.0);
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let searcher = searcher(&[("a.jpg", [1.0, 0.0])]);
        assert!(searcher.search("", 10).unwrap().is_empty());
        assert!(searcher.search("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_snapshot_returns_nothing() {
        let searcher = searcher(&[]);
        assert!(searcher.search("x", 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_page_slices_results() {
        let searcher = searcher(&[
            ("a.jpg", [1.0, 0.0]),
            ("b.jpg", [0.8, 0.6]),
            ("c.jpg", [0.0, 1.0]),
        ]);

        let page = searcher.search_page("x", 200, 2, 2).unwrap();
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].path, "c.jpg");
    }
}
