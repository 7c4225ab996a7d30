//! Hallucination-mitigation evaluation harness for retrieval-augmented
//! generation.
//!
//! The crate runs a batch of verification strategies (direct answering,
//! plain RAG, Chain-of-Verification, Self-RAG beam generation, and a
//! SelfCheckGPT-style consistency check) over evaluation datasets, persists
//! one YAML record per (item, solver) pair, and skips pairs that already
//! have a record so interrupted batches can simply be re-run.
//!
//! ```no_run
//! use std::path::Path;
//! use verirag::{ExperimentConfig, Runner};
//!
//! # async fn run() -> verirag::Result<()> {
//! let config = ExperimentConfig::from_yaml_file(Path::new("experiment.yaml"))?;
//! let runner = Runner::from_config(&config)?;
//! let summary = runner.run(&config).await?;
//! println!("solved {} items, skipped {}", summary.solved, summary.skipped);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod generation;
pub mod retrieval;
pub mod runner;
pub mod solver;
pub mod store;
pub mod types;

pub use config::{
    DatasetConfig, ExperimentConfig, GenerationParams, Method, ProviderConfig, ProviderKind,
    SelfRagParams, SolverConfig,
};
pub use error::{Error, Result};
pub use generation::{CompletionProvider, PromptAssembler, ProviderCache};
pub use retrieval::{FusedResult, HybridRetriever, RankedResult, RetrievalFuser};
pub use runner::{RunSummary, Runner};
pub use solver::Solver;
pub use store::{ResultKey, ResultStore};
pub use types::{EvalRecord, Passage, Query, SolveOutcome};
