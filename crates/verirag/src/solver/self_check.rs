//! Sampling-based self-consistency strategy (SelfCheckGPT style)
//!
//! Generates a primary answer plus a fixed number of independent samples of
//! the same question, scores each primary-answer sentence against the
//! sampled ensemble, then re-asks the question with the per-sentence
//! hallucination scores as context to obtain one revised final answer.

use std::sync::Arc;

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::GenerationParams;
use crate::error::Result;
use crate::generation::{CompletionProvider, PromptAssembler};
use crate::types::{Query, SolveOutcome};

/// Number of additional samples drawn beyond the primary answer
pub const SAMPLE_COUNT: usize = 3;

/// Scores each sentence's hallucination likelihood against an ensemble of
/// independently sampled answers.
///
/// Returns one float per sentence in `[0, 1]`, higher = more hallucinated.
#[async_trait]
pub trait ConsistencyScorer: Send + Sync {
    /// Score `sentences` against `samples`
    async fn score(&self, sentences: &[String], samples: &[String]) -> Result<Vec<f64>>;
}

/// LLM-prompted consistency scorer: asks, per (sentence, sample) pair,
/// whether the sample supports the sentence, and averages the verdicts.
pub struct PromptConsistencyScorer {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
}

impl PromptConsistencyScorer {
    /// Create a scorer using the given provider for support checks
    pub fn new(provider: Arc<dyn CompletionProvider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    /// Map a yes/no verdict to a hallucination contribution.
    /// Yes (supported) = 0.0, No = 1.0, anything else = 0.5.
    fn verdict_score(text: &str) -> f64 {
        let normalized = text.trim().to_lowercase();
        if normalized.starts_with("yes") {
            0.0
        } else if normalized.starts_with("no") {
            1.0
        } else {
            0.5
        }
    }
}

#[async_trait]
impl ConsistencyScorer for PromptConsistencyScorer {
    async fn score(&self, sentences: &[String], samples: &[String]) -> Result<Vec<f64>> {
        let mut scores = Vec::with_capacity(sentences.len());

        for sentence in sentences {
            if samples.is_empty() {
                scores.push(0.5);
                continue;
            }
            let mut total = 0.0;
            for sample in samples {
                let prompt = PromptAssembler::consistency_check(sentence, sample);
                let verdict = self.provider.complete(&prompt, &self.params).await?;
                total += Self::verdict_score(&verdict);
            }
            scores.push(total / samples.len() as f64);
        }

        Ok(scores)
    }
}

/// Split an answer into trimmed, non-empty sentences
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Self-consistency solver
pub struct SelfCheckSolver {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
    scorer: Arc<dyn ConsistencyScorer>,
}

impl SelfCheckSolver {
    /// Create a self-check solver with the given consistency scorer
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        params: GenerationParams,
        scorer: Arc<dyn ConsistencyScorer>,
    ) -> Self {
        Self {
            provider,
            params,
            scorer,
        }
    }

    /// Model serving this solver
    pub fn model_name(&self) -> &str {
        self.provider.model()
    }

    /// Run the three stages plus one revision round
    pub async fn solve(&self, query: &Query) -> Result<SolveOutcome> {
        tracing::debug!("selfcheck: generating primary answer");
        let pre_answer = self.provider.complete(&query.question, &self.params).await?;

        // exactly SAMPLE_COUNT extra samples, regardless of answer length
        let mut samples = Vec::with_capacity(SAMPLE_COUNT);
        for i in 0..SAMPLE_COUNT {
            tracing::debug!(sample = i + 1, "selfcheck: drawing ensemble sample");
            let sample = self.provider.complete(&query.question, &self.params).await?;
            samples.push(sample);
        }

        let sentences = split_sentences(&pre_answer);
        tracing::debug!(sentences = sentences.len(), "selfcheck: scoring sentences");
        let scores = self.scorer.score(&sentences, &samples).await?;

        let scored: Vec<(String, f64)> = sentences.into_iter().zip(scores).collect();
        let revision_prompt =
            PromptAssembler::selfcheck_revision(&query.question, &pre_answer, &scored);

        tracing::debug!("selfcheck: generating revised answer");
        let final_answer = self.provider.complete(&revision_prompt, &self.params).await?;

        let score_map: serde_json::Map<String, serde_json::Value> = scored
            .iter()
            .map(|(sentence, score)| (sentence.clone(), serde_json::json!(score)))
            .collect();

        Ok(SolveOutcome::new(final_answer)
            .with_artifact("pre_answer", pre_answer)
            .with_artifact(
                "sentence_hallucination_scores",
                serde_json::Value::Object(score_map),
            ))
    }
}
