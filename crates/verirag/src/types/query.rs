//! Query and passage types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum number of passages a query may carry.
///
/// Enforced at construction; downstream code may rely on it.
pub const MAX_PASSAGES: usize = 10;

/// A retrievable unit of context text, immutable once retrieved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage title
    pub title: String,
    /// Passage body
    pub content: String,
    /// Relevance score assigned by the retriever that produced it, if any
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

impl Passage {
    /// Create a passage without a retrieval score
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            relevance_score: None,
        }
    }

    /// Create a passage with a retrieval score
    pub fn scored(
        title: impl Into<String>,
        content: impl Into<String>,
        relevance_score: f64,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            relevance_score: Some(relevance_score),
        }
    }
}

/// One evaluation item: a question with its grounding passages.
///
/// Created once per dataset entry and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// The question to answer
    pub question: String,
    /// Ground-truth answer where the dataset provides one
    #[serde(default)]
    pub reference_answer: Option<String>,
    /// Grounding passages, at most [`MAX_PASSAGES`]
    pub passages: Vec<Passage>,
    /// Item metadata (dataset name, etc.)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Query {
    /// Create a query, truncating the passage list to [`MAX_PASSAGES`]
    pub fn new(
        question: impl Into<String>,
        reference_answer: Option<String>,
        mut passages: Vec<Passage>,
    ) -> Self {
        passages.truncate(MAX_PASSAGES);
        Self {
            question: question.into(),
            reference_answer,
            passages,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Dataset name from metadata, or "unknown"
    pub fn dataset(&self) -> &str {
        self.metadata
            .get("dataset")
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}
