//! Dataset loading
//!
//! Narrow plumbing: each supported dataset is parsed into [`Query`] items
//! with at most [`MAX_PASSAGES`](crate::types::MAX_PASSAGES) grounding
//! passages. Items keep file order so that re-runs against the same output
//! directory see a stable item set.

use std::path::Path;

use serde::Deserialize;

use crate::config::DatasetConfig;
use crate::error::{Error, Result};
use crate::types::{Passage, Query};

/// A loaded dataset
#[derive(Debug)]
pub struct Dataset {
    /// Display name ("ASQA", "FactScore")
    pub name: String,
    /// Evaluation items
    pub items: Vec<Query>,
}

#[derive(Deserialize)]
struct RawDoc {
    title: String,
    text: String,
    #[serde(default)]
    score: Option<serde_json::Value>,
}

impl RawDoc {
    fn into_passage(self) -> Passage {
        // scores appear both as numbers and as numeric strings in the wild
        let score = self.score.as_ref().and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        Passage {
            title: self.title,
            content: self.text,
            relevance_score: score,
        }
    }
}

#[derive(Deserialize)]
struct AsqaEntry {
    question: String,
    #[serde(default)]
    answer: Option<String>,
    docs: Vec<RawDoc>,
}

#[derive(Deserialize)]
struct FactScoreEntry {
    input: String,
    ctxs: Vec<RawDoc>,
}

/// Load the dataset named by `config`
pub fn load(config: &DatasetConfig) -> Result<Dataset> {
    match config.name.as_str() {
        "asqa" => load_asqa(&config.path, config.number),
        "factscore" => load_factscore(&config.path, config.number),
        other => Err(Error::config(format!("unsupported dataset name: {other}"))),
    }
}

fn load_asqa(path: &Path, number: Option<usize>) -> Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::dataset("asqa", format!("cannot read {}: {e}", path.display())))?;
    let entries: Vec<AsqaEntry> = serde_json::from_str(&raw)
        .map_err(|e| Error::dataset("asqa", format!("invalid JSON: {e}")))?;

    let items = entries
        .into_iter()
        .take(number.unwrap_or(usize::MAX))
        .map(|entry| {
            let passages = entry.docs.into_iter().map(RawDoc::into_passage).collect();
            Query::new(entry.question, entry.answer, passages)
                .with_metadata("dataset", "ASQA")
        })
        .collect();

    Ok(Dataset {
        name: "ASQA".to_string(),
        items,
    })
}

fn load_factscore(path: &Path, number: Option<usize>) -> Result<Dataset> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::dataset("factscore", format!("cannot read {}: {e}", path.display()))
    })?;

    let mut items = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: FactScoreEntry = serde_json::from_str(line).map_err(|e| {
            Error::dataset("factscore", format!("invalid JSONL at line {}: {e}", line_no + 1))
        })?;
        let passages = entry.ctxs.into_iter().map(RawDoc::into_passage).collect();
        // FactScore carries no reference answers
        items.push(
            Query::new(entry.input, None, passages).with_metadata("dataset", "FactScore"),
        );
        if let Some(cap) = number {
            if items.len() >= cap {
                break;
            }
        }
    }

    Ok(Dataset {
        name: "FactScore".to_string(),
        items,
    })
}
