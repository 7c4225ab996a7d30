//! Score fusion across a dense and a sparse ranking of the same pool
//!
//! The two rankers need not return identical candidate sets. Dense scores
//! are distances (lower = better) and are normalized as `1 / (1 + raw)`
//! before fusing. The sparse side contributes a flag value of `1.0` for any
//! passage present in the sparse list and `0.0` otherwise; this is an
//! inherited convention, not a rank-derived value, and is kept as-is for
//! score parity with the system this was ported from. It is deliberately
//! not reciprocal-rank fusion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Passage;

/// Which ranker produced a [`RankedResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankSource {
    /// Vector-similarity ranker; raw score is a distance, lower = better
    Dense,
    /// Lexical ranker; list order is the ranking, raw score is unused
    Sparse,
}

/// A single ranker hit, transient per retrieval call
#[derive(Debug, Clone)]
pub struct RankedResult {
    /// The candidate passage
    pub passage: Passage,
    /// Raw ranker score; a distance for dense results, unused for sparse
    pub raw_score: f64,
    /// Producing ranker
    pub source: RankSource,
}

impl RankedResult {
    /// Dense hit with its raw distance
    pub fn dense(passage: Passage, distance: f64) -> Self {
        Self {
            passage,
            raw_score: distance,
            source: RankSource::Dense,
        }
    }

    /// Sparse hit; position in the input list is the ranking
    pub fn sparse(passage: Passage) -> Self {
        Self {
            passage,
            raw_score: 0.0,
            source: RankSource::Sparse,
        }
    }
}

/// Fused candidate with its combined score
#[derive(Debug, Clone)]
pub struct FusedResult {
    /// The passage
    pub passage: Passage,
    /// Combined score, higher = better
    pub fused_score: f64,
}

/// Combines a dense and a sparse ranking into one ordered list.
///
/// Pure function of its inputs: same inputs, same output, no hidden state.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalFuser {
    dense_weight: f64,
}

impl Default for RetrievalFuser {
    fn default() -> Self {
        Self::new(0.5)
    }
}

struct Candidate {
    passage: Passage,
    dense_norm: f64,
    sparse_flag: f64,
    // first-seen position, dense list before sparse list, for tie-breaking
    order: usize,
}

impl RetrievalFuser {
    /// Create a fuser; `dense_weight` must lie in `[0, 1]`
    pub fn new(dense_weight: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&dense_weight));
        Self { dense_weight }
    }

    /// Fuse the two rankings and return the top `k` passages by combined
    /// score, descending. Ties keep first-seen order (dense list first).
    ///
    /// A passage appearing in neither input never appears in the output,
    /// and no passage appears twice.
    pub fn fuse(
        &self,
        dense_results: &[RankedResult],
        sparse_results: &[RankedResult],
        k: usize,
    ) -> Vec<FusedResult> {
        let mut by_content: HashMap<&str, usize> = HashMap::new();
        let mut candidates: Vec<Candidate> = Vec::new();

        for result in dense_results {
            let key = result.passage.content.as_str();
            if by_content.contains_key(key) {
                continue;
            }
            by_content.insert(key, candidates.len());
            candidates.push(Candidate {
                passage: result.passage.clone(),
                dense_norm: 1.0 / (1.0 + result.raw_score),
                sparse_flag: 0.0,
                order: candidates.len(),
            });
        }

        for result in sparse_results {
            let key = result.passage.content.as_str();
            match by_content.get(key) {
                Some(&idx) => {
                    // present in both rankings: sparse presence is the flag
                    candidates[idx].sparse_flag = 1.0;
                }
                None => {
                    by_content.insert(key, candidates.len());
                    candidates.push(Candidate {
                        passage: result.passage.clone(),
                        // missing dense ranking: distance treated as
                        // infinitely far, normalized contribution 0
                        dense_norm: 0.0,
                        sparse_flag: 1.0,
                        order: candidates.len(),
                    });
                }
            }
        }

        let mut fused: Vec<(FusedResult, usize)> = candidates
            .into_iter()
            .map(|c| {
                let fused_score =
                    self.dense_weight * c.dense_norm + (1.0 - self.dense_weight) * c.sparse_flag;
                (
                    FusedResult {
                        passage: c.passage,
                        fused_score,
                    },
                    c.order,
                )
            })
            .collect();

        fused.sort_by(|a, b| {
            b.0.fused_score
                .partial_cmp(&a.0.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        fused.truncate(k);
        fused.into_iter().map(|(f, _)| f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(name: &str) -> Passage {
        Passage::new(name, name)
    }

    fn dense(pairs: &[(&str, f64)]) -> Vec<RankedResult> {
        pairs
            .iter()
            .map(|(name, d)| RankedResult::dense(passage(name), *d))
            .collect()
    }

    fn sparse(names: &[&str]) -> Vec<RankedResult> {
        names
            .iter()
            .map(|name| RankedResult::sparse(passage(name)))
            .collect()
    }

    #[test]
    fn worked_example_pins_sparse_flag_convention() {
        // dense: P1 at 0.2, P2 at 0.5; sparse: P2, P3; k = 2, weight 0.5.
        // P1 = 0.5 * 1/(1.2)       = 0.41666...
        // P2 = 0.5 * 1/(1.5) + 0.5 = 0.83333...
        // P3 = 0.5 * 0.0     + 0.5 = 0.5
        let fuser = RetrievalFuser::new(0.5);
        let out = fuser.fuse(&dense(&[("P1", 0.2), ("P2", 0.5)]), &sparse(&["P2", "P3"]), 2);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].passage.title, "P2");
        assert!((out[0].fused_score - (0.5 / 1.5 + 0.5)).abs() < 1e-9);
        assert_eq!(out[1].passage.title, "P3");
        assert!((out[1].fused_score - 0.5).abs() < 1e-9);
        // P1, dense-only, ranks below the sparse-only flag value
        assert!(out.iter().all(|f| f.passage.title != "P1"));
    }

    #[test]
    fn passage_in_neither_input_never_appears() {
        let fuser = RetrievalFuser::new(0.5);
        let out = fuser.fuse(&dense(&[("P1", 0.1)]), &sparse(&["P2"]), 10);
        let titles: Vec<&str> = out.iter().map(|f| f.passage.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(!titles.contains(&"P3"));
    }

    #[test]
    fn output_is_deterministic() {
        let fuser = RetrievalFuser::new(0.7);
        let d = dense(&[("A", 0.3), ("B", 0.9), ("C", 1.4)]);
        let s = sparse(&["C", "D", "A"]);

        let first = fuser.fuse(&d, &s, 3);
        for _ in 0..10 {
            let again = fuser.fuse(&d, &s, 3);
            assert_eq!(first.len(), again.len());
            for (a, b) in first.iter().zip(again.iter()) {
                assert_eq!(a.passage, b.passage);
                assert_eq!(a.fused_score.to_bits(), b.fused_score.to_bits());
            }
        }
    }

    #[test]
    fn top_k_bounded_by_union_size() {
        let fuser = RetrievalFuser::default();
        let d = dense(&[("A", 0.3), ("B", 0.9)]);
        let s = sparse(&["B", "C"]);
        assert_eq!(fuser.fuse(&d, &s, 10).len(), 3);
        assert_eq!(fuser.fuse(&d, &s, 2).len(), 2);
        assert_eq!(fuser.fuse(&[], &[], 5).len(), 0);
    }

    #[test]
    fn scores_are_monotone_descending() {
        let fuser = RetrievalFuser::new(0.4);
        let d = dense(&[("A", 0.1), ("B", 0.6), ("C", 2.0), ("D", 0.05)]);
        let s = sparse(&["C", "E", "A"]);
        let out = fuser.fuse(&d, &s, 10);
        for pair in out.windows(2) {
            assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[test]
    fn ties_keep_dense_first_seen_order() {
        // two sparse-only passages tie at the flag value; dense-only pair
        // with equal distances ties as well
        let fuser = RetrievalFuser::new(0.5);
        let d = dense(&[("A", 1.0), ("B", 1.0)]);
        let s = sparse(&["X", "Y"]);
        let out = fuser.fuse(&d, &s, 10);
        let titles: Vec<&str> = out.iter().map(|f| f.passage.title.as_str()).collect();
        assert_eq!(titles, vec!["X", "Y", "A", "B"]);
    }

    #[test]
    fn duplicate_ranker_hits_collapse() {
        let fuser = RetrievalFuser::new(0.5);
        let d = dense(&[("A", 0.2), ("A", 0.9)]);
        let s = sparse(&["A", "A"]);
        let out = fuser.fuse(&d, &s, 10);
        assert_eq!(out.len(), 1);
        // first dense occurrence wins the distance
        assert!((out[0].fused_score - (0.5 / 1.2 + 0.5)).abs() < 1e-9);
    }
}
