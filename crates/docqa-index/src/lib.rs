//! docqa-index
//!
//! In-memory nearest-neighbor index over embedded chunks. Retrieval is a
//! brute-force cosine scan, which is exact and fast enough for the
//! per-document corpora this system indexes. An index is read-only after
//! construction: superseding it means building a new one and swapping the
//! handle, never mutating in place, so in-flight queries can never race a
//! rebuild.

use docqa_core::error::{Error, Result};
use docqa_core::types::{DocumentChunk, ScoredChunk};

#[derive(Debug)]
pub struct RetrievalIndex {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
    dim: usize,
}

impl RetrievalIndex {
    /// Pair chunks with their embedding vectors. Counts must match and
    /// every vector must share one dimension. Zero chunks is legal and
    /// yields an index that answers every query with no results.
    pub fn build(chunks: Vec<DocumentChunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(Error::IndexBuild(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dim = embeddings.first().map_or(0, Vec::len);
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
            return Err(Error::IndexBuild(format!(
                "embedding {} has dim {}, expected {}",
                bad,
                embeddings[bad].len(),
                dim
            )));
        }
        let entries = chunks.into_iter().zip(embeddings).collect();
        Ok(Self { entries, dim })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Top-k chunks by cosine similarity, descending. Ties keep insertion
    /// order (the sort is stable). Fewer than k entries returns them all.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, vec)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(vec, query_vec),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(i: usize) -> DocumentChunk {
        DocumentChunk {
            id: format!("doc:{i}"),
            doc_id: "doc".to_string(),
            doc_path: "/tmp/doc.docx".to_string(),
            content: format!("chunk {i}"),
            char_offset: i * 450,
            chunk_index: i,
            total_chunks: 0,
        }
    }

    #[test]
    fn self_match_is_top_one() {
        let vecs = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.6, 0.8, 0.0]];
        let index = RetrievalIndex::build((0..3).map(chunk).collect(), vecs.clone()).expect("build");
        for (i, v) in vecs.iter().enumerate() {
            let hits = index.search(v, 1);
            assert_eq!(hits[0].chunk.chunk_index, i, "chunk {i} must match itself first");
            assert!((hits[0].score - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn results_are_sorted_descending_and_bounded_by_len() {
        let vecs = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        let index = RetrievalIndex::build((0..3).map(chunk).collect(), vecs).expect("build");

        let hits = index.search(&[1.0, 0.0], 10);
        assert_eq!(hits.len(), 3, "k beyond len returns everything");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score, "descending order");
        }
        assert_eq!(hits[0].chunk.chunk_index, 0);
    }

    #[test]
    fn ties_keep_insertion_order() {
        // Two identical vectors score identically against any query.
        let vecs = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let index = RetrievalIndex::build((0..2).map(chunk).collect(), vecs).expect("build");
        let hits = index.search(&[0.5, 0.5], 2);
        assert_eq!(hits[0].chunk.chunk_index, 0);
        assert_eq!(hits[1].chunk.chunk_index, 1);
    }

    #[test]
    fn empty_index_returns_no_results() {
        let index = RetrievalIndex::build(Vec::new(), Vec::new()).expect("build");
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn mismatched_counts_and_dims_are_rejected() {
        let err = RetrievalIndex::build(vec![chunk(0)], Vec::new()).expect_err("count mismatch");
        assert!(matches!(err, Error::IndexBuild(_)));

        let err = RetrievalIndex::build(
            vec![chunk(0), chunk(1)],
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        )
        .expect_err("dim mismatch");
        assert!(matches!(err, Error::IndexBuild(_)));
    }

    #[test]
    fn zero_magnitude_vectors_score_zero() {
        let index = RetrievalIndex::build(vec![chunk(0)], vec![vec![0.0, 0.0]]).expect("build");
        let hits = index.search(&[1.0, 0.0], 1);
        assert_eq!(hits[0].score, 0.0);
    }
}
