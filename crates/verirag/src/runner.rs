//! Batch orchestration: datasets × items × solvers
//!
//! The loop is sequential by design: each (item, solver) pair runs to
//! completion before the next starts. A solve failure that is fatal for the
//! current pair only (see [`Error::is_per_item`]) is logged with the
//! offending query and solver identity and the batch continues; any other
//! error aborts the run. Items with an existing record are skipped before
//! `solve` is invoked, making re-runs against the same output directory
//! idempotent.

use crate::config::ExperimentConfig;
use crate::dataset::{self, Dataset};
use crate::error::{Error, Result};
use crate::generation::ProviderCache;
use crate::solver::Solver;
use crate::store::{ResultKey, ResultStore};
use crate::types::EvalRecord;

/// Counters for one batch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Records produced this run
    pub solved: usize,
    /// Items skipped because a record already existed
    pub skipped: usize,
    /// Per-item solve failures, recorded in the log only
    pub failed: usize,
}

/// Batch runner over a result store and a fixed solver set
pub struct Runner {
    store: ResultStore,
    solvers: Vec<Solver>,
}

impl Runner {
    /// Create a runner from pre-built parts
    pub fn new(store: ResultStore, solvers: Vec<Solver>) -> Self {
        Self { store, solvers }
    }

    /// Build the runner from configuration.
    ///
    /// All solvers are constructed here; configuration problems surface
    /// before any dataset item is touched.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let providers = ProviderCache::new(config.providers.clone());
        let solvers = config
            .solvers
            .iter()
            .map(|solver_config| Solver::from_config(solver_config, &providers))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(ResultStore::new(&config.output_dir), solvers))
    }

    /// Run every configured dataset
    pub async fn run(&self, config: &ExperimentConfig) -> Result<RunSummary> {
        let mut total = RunSummary::default();
        for dataset_config in &config.datasets {
            let dataset = dataset::load(dataset_config)?;
            tracing::info!(
                dataset = %dataset.name,
                items = dataset.items.len(),
                "evaluating dataset"
            );
            let summary = self.run_dataset(&dataset).await?;
            total.solved += summary.solved;
            total.skipped += summary.skipped;
            total.failed += summary.failed;
        }
        Ok(total)
    }

    /// Run one loaded dataset against every solver.
    ///
    /// Per-item failures are counted and skipped; any other error aborts.
    pub async fn run_dataset(&self, dataset: &Dataset) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (index, item) in dataset.items.iter().enumerate() {
            tracing::info!(
                item = index + 1,
                total = dataset.items.len(),
                question = %item.question,
                "processing item"
            );

            for solver in &self.solvers {
                let key = ResultKey {
                    dataset: dataset.name.clone(),
                    question: item.question.clone(),
                    method: solver.method().as_str().to_string(),
                    model: solver.model_name().to_string(),
                };

                if self.store.exists(&key) {
                    tracing::info!(
                        method = solver.method().as_str(),
                        model = solver.model_name(),
                        "record exists, skipping"
                    );
                    summary.skipped += 1;
                    continue;
                }

                tracing::info!(
                    method = solver.method().as_str(),
                    model = solver.model_name(),
                    "solving"
                );

                match solver.solve(item).await {
                    Ok(outcome) => {
                        let record = EvalRecord::from_outcome(item, &outcome);
                        // a store failure would recur on every item: abort
                        let path = self.store.save(&key, &record)?;
                        tracing::info!(path = %path.display(), "record saved");
                        summary.solved += 1;
                    }
                    Err(e) if e.is_per_item() => {
                        tracing::warn!(
                            question = %item.question,
                            method = solver.method().as_str(),
                            model = solver.model_name(),
                            error = %e,
                            "solve failed, skipping item"
                        );
                        summary.failed += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            question = %item.question,
                            method = solver.method().as_str(),
                            error = %e,
                            "aborting batch"
                        );
                        return Err(e);
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GenerationParams;
    use crate::solver::testing::ScriptedProvider;
    use crate::solver::DirectSolver;
    use crate::types::{Passage, Query};

    fn dataset() -> Dataset {
        Dataset {
            name: "ASQA".to_string(),
            items: vec![
                Query::new("q one?", None, vec![Passage::new("t", "c")])
                    .with_metadata("dataset", "ASQA"),
                Query::new("q two?", None, Vec::new()).with_metadata("dataset", "ASQA"),
            ],
        }
    }

    #[tokio::test]
    async fn second_run_processes_zero_new_items() {
        let dir = tempfile::tempdir().unwrap();

        let provider = Arc::new(ScriptedProvider::new(["a1", "a2"]));
        let runner = Runner::new(
            ResultStore::new(dir.path()),
            vec![Solver::Direct(DirectSolver::new(
                Arc::clone(&provider) as _,
                GenerationParams::default(),
            ))],
        );

        let first = runner.run_dataset(&dataset()).await.unwrap();
        assert_eq!(first, RunSummary { solved: 2, skipped: 0, failed: 0 });
        assert_eq!(provider.calls(), 2);

        // same output directory: everything is already recorded
        let second = runner.run_dataset(&dataset()).await.unwrap();
        assert_eq!(second, RunSummary { solved: 0, skipped: 2, failed: 0 });
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();

        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        provider.push_failure("timeout");
        provider.push_response("fine");

        let runner = Runner::new(
            ResultStore::new(dir.path()),
            vec![Solver::Direct(DirectSolver::new(
                Arc::clone(&provider) as _,
                GenerationParams::default(),
            ))],
        );

        let summary = runner.run_dataset(&dataset()).await.unwrap();
        assert_eq!(summary, RunSummary { solved: 1, skipped: 0, failed: 1 });

        // a re-run retries only the failed item
        provider.push_response("recovered");
        let retry = runner.run_dataset(&dataset()).await.unwrap();
        assert_eq!(retry, RunSummary { solved: 1, skipped: 1, failed: 0 });
    }

    #[tokio::test]
    async fn non_transport_error_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();

        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        provider.push_error(Error::internal("provider state poisoned"));
        provider.push_response("never reached");

        let runner = Runner::new(
            ResultStore::new(dir.path()),
            vec![Solver::Direct(DirectSolver::new(
                Arc::clone(&provider) as _,
                GenerationParams::default(),
            ))],
        );

        let err = runner.run_dataset(&dataset()).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        // the second item was never attempted
        assert_eq!(provider.calls(), 1);
    }
}
