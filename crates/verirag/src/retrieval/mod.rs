//! Hybrid retrieval: independent dense and sparse rankers fused into one list

pub mod fuser;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::Passage;

pub use fuser::{FusedResult, RankSource, RankedResult, RetrievalFuser};

/// Dense (vector similarity) ranker boundary.
///
/// Returns `(passage, distance)` pairs, lower distance = better. Distances
/// are raw, not pre-normalized similarities.
#[async_trait]
pub trait DenseRanker: Send + Sync {
    /// Rank up to `k` passages for the query
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<(Passage, f64)>>;
}

/// Sparse (lexical) ranker boundary.
///
/// Returns passages only, unscored, already rank-ordered. The asymmetry with
/// [`DenseRanker`] is intentional; the fuser tolerates the unscored list.
#[async_trait]
pub trait SparseRanker: Send + Sync {
    /// Rank up to `k` passages for the query
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Retriever combining a dense and a sparse ranker through [`RetrievalFuser`]
pub struct HybridRetriever {
    dense: Arc<dyn DenseRanker>,
    sparse: Arc<dyn SparseRanker>,
    fuser: RetrievalFuser,
}

impl HybridRetriever {
    /// Create a hybrid retriever with the given dense-ranking weight
    pub fn new(dense: Arc<dyn DenseRanker>, sparse: Arc<dyn SparseRanker>, dense_weight: f64) -> Self {
        Self {
            dense,
            sparse,
            fuser: RetrievalFuser::new(dense_weight),
        }
    }

    /// Retrieve the top `k` fused passages for a query.
    ///
    /// Over-fetches `2k` candidates from each ranker so that passages missed
    /// by one ranker can still surface after fusion.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<FusedResult>> {
        let dense_raw = self.dense.rank(query, k * 2).await?;
        let sparse_raw = self.sparse.rank(query, k * 2).await?;

        let dense: Vec<RankedResult> = dense_raw
            .into_iter()
            .map(|(passage, distance)| RankedResult::dense(passage, distance))
            .collect();
        let sparse: Vec<RankedResult> = sparse_raw
            .into_iter()
            .map(RankedResult::sparse)
            .collect();

        let fused = self.fuser.fuse(&dense, &sparse, k);
        tracing::debug!(candidates = fused.len(), k, "hybrid retrieval complete");
        Ok(fused)
    }
}
