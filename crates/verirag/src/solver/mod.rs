//! Verification solver strategies
//!
//! Each strategy implements the same contract: `solve(query) -> SolveOutcome`.
//! Dispatch is a closed enum resolved once at construction time; a `solve`
//! call is stateless apart from read-only configuration, so independent
//! call sites may invoke the same solver concurrently.

pub mod cove;
pub mod direct;
pub mod rag;
pub mod self_check;
pub mod self_rag;

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Method, SolverConfig};
use crate::error::{Error, Result};
use crate::generation::ProviderCache;
use crate::types::{Query, SolveOutcome};

pub use cove::CoveSolver;
pub use direct::DirectSolver;
pub use rag::RagSolver;
pub use self_check::{ConsistencyScorer, PromptConsistencyScorer, SelfCheckSolver};
pub use self_rag::SelfRagSolver;

/// A configured solver strategy
pub enum Solver {
    /// Single unaugmented completion
    Direct(DirectSolver),
    /// Retrieval-augmented generation
    Rag(RagSolver),
    /// Chain-of-Verification over RAG
    Cove(CoveSolver),
    /// Critique-token guided beam generation
    SelfRag(SelfRagSolver),
    /// Sampling-based self-consistency check
    SelfCheck(SelfCheckSolver),
}

impl Solver {
    /// Build a solver from configuration.
    ///
    /// Fails fast: missing required parameters (e.g. `rag_docs_number` for a
    /// RAG-family method) surface here, never at solve time.
    pub fn from_config(config: &SolverConfig, providers: &ProviderCache) -> Result<Self> {
        let provider = providers.get(config.provider, &config.model)?;

        let rag_docs = |method: &str| -> Result<usize> {
            config.rag_docs_number.ok_or_else(|| {
                Error::config(format!("rag_docs_number is required for method {method}"))
            })
        };

        let solver = match config.method {
            Method::DirectAnswer => {
                Self::Direct(DirectSolver::new(provider, config.params.clone()))
            }
            Method::UseRag => Self::Rag(RagSolver::new(
                provider,
                config.params.clone(),
                rag_docs("use-rag")?,
            )),
            Method::UseCove => Self::Cove(CoveSolver::new(
                provider,
                config.params.clone(),
                rag_docs("use-cove")?,
            )),
            Method::UseSelfRag => Self::SelfRag(SelfRagSolver::new(
                provider,
                config.params.clone(),
                rag_docs("use-self-rag")?,
                config.self_rag.clone(),
            )),
            Method::UseSelfcheckgpt => {
                let scorer = Arc::new(PromptConsistencyScorer::new(
                    Arc::clone(&provider),
                    config.params.clone(),
                ));
                Self::SelfCheck(SelfCheckSolver::new(provider, config.params.clone(), scorer))
            }
        };

        Ok(solver)
    }

    /// Strategy identifier
    pub fn method(&self) -> Method {
        match self {
            Self::Direct(_) => Method::DirectAnswer,
            Self::Rag(_) => Method::UseRag,
            Self::Cove(_) => Method::UseCove,
            Self::SelfRag(_) => Method::UseSelfRag,
            Self::SelfCheck(_) => Method::UseSelfcheckgpt,
        }
    }

    /// Model serving this solver
    pub fn model_name(&self) -> &str {
        match self {
            Self::Direct(s) => s.model_name(),
            Self::Rag(s) => s.model_name(),
            Self::Cove(s) => s.model_name(),
            Self::SelfRag(s) => s.model_name(),
            Self::SelfCheck(s) => s.model_name(),
        }
    }

    /// Solve one query, timing the strategy and attaching solve metadata.
    ///
    /// A transport failure in any stage surfaces as an error; there is no
    /// partial outcome for a failed solve.
    pub async fn solve(&self, query: &Query) -> Result<SolveOutcome> {
        let started = Instant::now();

        let mut outcome = match self {
            Self::Direct(s) => s.solve(query).await?,
            Self::Rag(s) => s.solve(query).await?,
            Self::Cove(s) => s.solve(query).await?,
            Self::SelfRag(s) => s.solve(query).await?,
            Self::SelfCheck(s) => s.solve(query).await?,
        };

        let elapsed = started.elapsed().as_secs_f64();
        outcome
            .metadata
            .insert("solve_time".to_string(), serde_json::json!(elapsed));
        outcome.metadata.insert(
            "solve_method".to_string(),
            serde_json::json!(self.method().as_str()),
        );
        outcome.metadata.insert(
            "model_name".to_string(),
            serde_json::json!(self.model_name()),
        );
        outcome
            .metadata
            .insert("dataset".to_string(), serde_json::json!(query.dataset()));

        Ok(outcome)
    }
}
