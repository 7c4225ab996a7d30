//! Chain-of-Verification strategy (CoVe on top of RAG)
//!
//! Four strictly forward stages: draft an answer with retrieved context,
//! generate fact-checking questions from the draft, answer those questions
//! against the same context, then synthesize the final answer. Every stage
//! output is kept verbatim as an intermediate artifact. A failed stage
//! aborts the chain; later artifacts are never produced.

use std::sync::Arc;

use crate::config::GenerationParams;
use crate::error::Result;
use crate::generation::{CompletionProvider, PromptAssembler};
use crate::types::{Query, SolveOutcome};

/// Chain-of-Verification solver
pub struct CoveSolver {
    provider: Arc<dyn CompletionProvider>,
    params: GenerationParams,
    rag_docs_number: usize,
}

impl CoveSolver {
    /// Create a CoVe solver showing `rag_docs_number` passages
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

    /// Run the four-stage chain
    pub async fn solve(&self, query: &Query) -> Result<SolveOutcome> {
        let n = self.rag_docs_number.min(query.passages.len());
        let shown = &query.passages[..n];
        let context_block = PromptAssembler::context_block(shown);

        tracing::debug!("cove: drafting preliminary answer");
        let draft_prompt = PromptAssembler::rag_answer(&query.question, shown);
        let pre_answer = self.provider.complete(&draft_prompt, &self.params).await?;

        tracing::debug!("cove: generating verification questions");
        let question_prompt = PromptAssembler::verification_questions(&pre_answer);
        let verification_questions = self.provider.complete(&question_prompt, &self.params).await?;

        tracing::debug!("cove: answering verification questions");
        let verify_prompt =
            PromptAssembler::verification_answers(&context_block, &verification_questions);
        let verification_answers = self.provider.complete(&verify_prompt, &self.params).await?;

        tracing::debug!("cove: synthesizing final answer");
        let synthesis_prompt = PromptAssembler::final_synthesis(
            &context_block,
            &pre_answer,
            &verification_questions,
            &verification_answers,
            &query.question,
        );
        let final_answer = self.provider.complete(&synthesis_prompt, &self.params).await?;

        let refs = shown.iter().map(|p| p.content.clone()).collect();
        Ok(SolveOutcome::new(final_answer)
            .with_retrieved(refs)
            .with_artifact("pre_answer", pre_answer)
            .with_artifact("verification_questions", verification_questions)
            .with_artifact("verification_answers", verification_answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::solver::testing::ScriptedProvider;
    use crate::types::Passage;

    fn query() -> Query {
        Query::new(
            "when was X founded?",
            None,
            vec![Passage::new("X", "X was founded in 1901.")],
        )
    }

    #[tokio::test]
    async fn chain_stores_stage_artifacts_in_causal_order() {
        let provider = Arc::new(ScriptedProvider::new([
            "draft: 1901",
            "Q1: when?\nQ2: where?",
            "A1: 1901\nA2: unknown",
            "X was founded in 1901.",
        ]));
        let solver = CoveSolver::new(Arc::clone(&provider) as _, GenerationParams::default(), 1);

        let outcome = solver.solve(&query()).await.unwrap();
        assert_eq!(outcome.final_answer, "X was founded in 1901.");
        assert_eq!(
            outcome.intermediate.get("pre_answer").unwrap(),
            &serde_json::json!("draft: 1901")
        );
        assert_eq!(
            outcome.intermediate.get("verification_questions").unwrap(),
            &serde_json::json!("Q1: when?\nQ2: where?")
        );
        assert_eq!(
            outcome.intermediate.get("verification_answers").unwrap(),
            &serde_json::json!("A1: 1901\nA2: unknown")
        );
        assert_eq!(provider.calls(), 4);

        // stage prompts chain each stage's verbatim output into the next
        let transcript = provider.transcript();
        assert!(transcript[1].contains("draft: 1901"));
        assert!(transcript[2].contains("Q1: when?"));
        assert!(transcript[3].contains("A1: 1901"));
    }

    #[tokio::test]
    async fn failure_in_question_generation_stops_the_chain() {
        let provider = Arc::new(ScriptedProvider::new(["draft"]));
        provider.push_failure("timeout");
        let solver = CoveSolver::new(Arc::clone(&provider) as _, GenerationParams::default(), 1);

        let err = solver.solve(&query()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        // stage 3 and 4 never ran
        assert_eq!(provider.calls(), 2);
    }
}
