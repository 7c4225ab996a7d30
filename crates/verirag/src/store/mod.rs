//! Persisted evaluation records with idempotent re-runs
//!
//! One YAML record per (dataset item, solver), addressed by a sanitized
//! combination of dataset name, question text, and solver + model identity.
//! Presence of a record is authoritative: the batch loop queries
//! [`ResultStore::exists`] before solving and skips items already done.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::EvalRecord;

/// Replace every non-alphanumeric character with `_` and trim the ends
pub fn safe_name(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    replaced.trim_matches('_').to_string()
}

/// Unique address of one evaluation record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    /// Dataset name
    pub dataset: String,
    /// Question text
    pub question: String,
    /// Solver method identifier
    pub method: String,
    /// Model name
    pub model: String,
}

impl ResultKey {
    /// Relative record path:
    /// `{dataset}/{safe(question)}/{safe(method)}_with_{safe(model)}.yaml`
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.dataset)
            .join(safe_name(&self.question))
            .join(format!(
                "{}_with_{}.yaml",
                safe_name(&self.method),
                safe_name(&self.model)
            ))
    }
}

/// Filesystem-backed record store
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `root/eval_results`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into().join("eval_results"),
        }
    }

    /// Absolute path of a record
    pub fn path_for(&self, key: &ResultKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Whether a record already exists for this key
    pub fn exists(&self, key: &ResultKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Write a record. The write is whole-file; a present record is never
    /// partially overwritten.
    pub fn save(&self, key: &ResultKey, record: &EvalRecord) -> Result<PathBuf> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(record)?;
        std::fs::write(&path, yaml)?;
        Ok(path)
    }

    /// Load a record back
    pub fn load(&self, key: &ResultKey) -> Result<EvalRecord> {
        let raw = std::fs::read_to_string(self.path_for(key))?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Passage, Query, SolveOutcome};

    fn key() -> ResultKey {
        ResultKey {
            dataset: "ASQA".to_string(),
            question: "Who wrote Hamlet? (the play)".to_string(),
            method: "use-rag".to_string(),
            model: "gpt-4o".to_string(),
        }
    }

    #[test]
    fn safe_name_replaces_unsafe_characters() {
        assert_eq!(safe_name("Who wrote Hamlet?"), "Who_wrote_Hamlet");
        assert_eq!(safe_name("use-rag"), "use_rag");
        assert_eq!(safe_name("__x__"), "x");
    }

    #[test]
    fn key_path_is_sanitized() {
        let path = key().relative_path();
        assert_eq!(
            path,
            PathBuf::from("ASQA")
                .join("Who_wrote_Hamlet___the_play")
                .join("use_rag_with_gpt_4o.yaml")
        );
    }

    #[test]
    fn save_then_exists_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let key = key();

        assert!(!store.exists(&key));

        let query = Query::new("Who wrote Hamlet?", Some("Shakespeare".to_string()), vec![
            Passage::new("Hamlet", "A play by Shakespeare."),
        ]);
        let outcome = SolveOutcome::new("Shakespeare")
            .with_retrieved(vec!["A play by Shakespeare.".to_string()]);
        let record = EvalRecord::from_outcome(&query, &outcome);

        store.save(&key, &record).unwrap();
        assert!(store.exists(&key));

        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded.response, "Shakespeare");
        assert_eq!(
            loaded.retrieved_contexts,
            Some(vec!["A play by Shakespeare.".to_string()])
        );
    }
}
