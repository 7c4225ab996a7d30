//! Solver outcomes and the persisted evaluation record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::query::Query;

/// The result of one (query, solver) pair.
///
/// Produced once per solve, immutable, consumed by the external evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutcome {
    /// Final answer text
    pub final_answer: String,
    /// Contents of the passages actually shown to the generator.
    /// Empty for solvers that perform no retrieval.
    pub retrieved_context_refs: Vec<String>,
    /// Named intermediate artifacts, stored verbatim per stage
    #[serde(default)]
    pub intermediate: BTreeMap<String, serde_json::Value>,
    /// Solve-level metadata: solve_time, solve_method, model_name, dataset
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SolveOutcome {
    /// Outcome with an answer and no retrieval
    pub fn new(final_answer: impl Into<String>) -> Self {
        Self {
            final_answer: final_answer.into(),
            retrieved_context_refs: Vec::new(),
            intermediate: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the passages shown to the generator
    pub fn with_retrieved(mut self, refs: Vec<String>) -> Self {
        self.retrieved_context_refs = refs;
        self
    }

    /// Store a named intermediate artifact
    pub fn with_artifact(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.intermediate.insert(name.into(), value.into());
        self
    }

    /// Solve wall-clock time in seconds, if attached
    pub fn solve_time(&self) -> Option<f64> {
        self.metadata.get("solve_time").and_then(|v| v.as_f64())
    }
}

/// One persisted evaluation record per (dataset item, solver).
///
/// Field names follow the evaluator's input contract: `user_input`,
/// `reference`, `response`, `retrieved_contexts`, `reference_contexts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// The question
    pub user_input: String,
    /// Ground-truth answer, when the dataset provides one
    #[serde(default)]
    pub reference: Option<String>,
    /// The solver's final answer
    pub response: String,
    /// Passage text shown to the generator. `None` (omitted) for solvers
    /// that perform no retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_contexts: Option<Vec<String>>,
    /// Passage text from the original dataset item, which is not
    /// necessarily equal to `retrieved_contexts`
    pub reference_contexts: Vec<String>,
    /// Intermediate solver artifacts, verbatim
    #[serde(default)]
    pub intermediate: BTreeMap<String, serde_json::Value>,
    /// Solve metadata (solve_time, solve_method, model_name, dataset)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the record was produced
    pub created_at: DateTime<Utc>,
}

impl EvalRecord {
    /// Build the evaluator input record from a query and its outcome
    pub fn from_outcome(query: &Query, outcome: &SolveOutcome) -> Self {
        let retrieved_contexts = if outcome.retrieved_context_refs.is_empty() {
            None
        } else {
            Some(outcome.retrieved_context_refs.clone())
        };

        Self {
            user_input: query.question.clone(),
            reference: query.reference_answer.clone(),
            response: outcome.final_answer.clone(),
            retrieved_contexts,
            reference_contexts: query.passages.iter().map(|p| p.content.clone()).collect(),
            intermediate: outcome.intermediate.clone(),
            metadata: outcome.metadata.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    #[test]
    fn record_omits_retrieved_contexts_without_retrieval() {
        let query = Query::new("q", Some("ref".to_string()), vec![Passage::new("t", "body")]);
        let outcome = SolveOutcome::new("answer");
        let record = EvalRecord::from_outcome(&query, &outcome);

        assert!(record.retrieved_contexts.is_none());
        assert_eq!(record.reference_contexts, vec!["body".to_string()]);

        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(!yaml.contains("retrieved_contexts"));
    }

    #[test]
    fn record_carries_retrieved_contexts_when_present() {
        let query = Query::new("q", None, vec![Passage::new("t", "body")]);
        let outcome = SolveOutcome::new("answer").with_retrieved(vec!["body".to_string()]);
        let record = EvalRecord::from_outcome(&query, &outcome);
        assert_eq!(record.retrieved_contexts, Some(vec!["body".to_string()]));
    }
}
