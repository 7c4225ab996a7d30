//! Retrieval-augmented strategy: context prompt, one completion

use std::sync::Arc;

use crate::config::GenerationParams;
use crate::error::Result;
use crate::generation::{CompletionProvider, PromptAssembler};
use crate::types::{Passage, Query, SolveOutcome};

/// Answers with the top `rag_docs_number` passages as grounding context
pub struct RagSolver {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
    rag_docs_number: usize,
}

impl RagSolver {
    /// Create a RAG solver showing `rag_docs_number` passages
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        params: GenerationParams,
        rag_docs_number: usize,
    ) -> Self {
        Self {
            provider,
            params,
            rag_docs_number,
        }
    }

    /// Model serving this solver
    pub fn model_name(&self) -> &str {
        self.provider.model()
    }

    /// Passages actually shown to the generator
    pub(crate) fn shown_passages<'a>(&self, query: &'a Query) -> &'a [Passage] {
        let n = self.rag_docs_number.min(query.passages.len());
        &query.passages[..n]
    }

    /// Solve with a single context-grounded completion
    pub async fn solve(&self, query: &Query) -> Result<SolveOutcome> {
        let shown = self.shown_passages(query);
        let prompt = PromptAssembler::rag_answer(&query.question, shown);
        let answer = self.provider.complete(&prompt, &self.params).await?;

        let refs = shown.iter().map(|p| p.content.clone()).collect();
        Ok(SolveOutcome::new(answer).with_retrieved(refs))
    }
}
