//! Direct-answer strategy: one completion, no retrieval

use std::sync::Arc;

use crate::config::GenerationParams;
use crate::error::Result;
use crate::generation::CompletionProvider;
use crate::types::{Query, SolveOutcome};

/// Answers the bare question with a single completion call.
///
/// Performs no retrieval, so the outcome carries no retrieved contexts.
pub struct DirectSolver {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
}

impl DirectSolver {
    /// Create a direct-answer solver
    pub fn new(provider: Arc<dyn CompletionProvider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    /// Model serving this solver
    pub fn model_name(&self) -> &str {
        self.provider.model()
    }

    /// Solve by completing the question verbatim
    pub async fn solve(&self, query: &Query) -> Result<SolveOutcome> {
        let answer = self.provider.complete(&query.question, &self.params).await?;
        Ok(SolveOutcome::new(answer))
    }
}
