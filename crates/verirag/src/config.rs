//! Experiment configuration
//!
//! Loaded from a YAML file: datasets to evaluate, solvers to run, provider
//! endpoints, and the output directory for evaluation records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Solver strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Single unaugmented completion
    DirectAnswer,
    /// Retrieval-augmented generation
    UseRag,
    /// Chain-of-Verification on top of RAG
    UseCove,
    /// Critique-token guided beam generation
    UseSelfRag,
    /// Sampling-based self-consistency check
    UseSelfcheckgpt,
}

impl Method {
    /// Stable identifier used in result keys and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::DirectAnswer => "direct-answer",
            Method::UseRag => "use-rag",
            Method::UseCove => "use-cove",
            Method::UseSelfRag => "use-self-rag",
            Method::UseSelfcheckgpt => "use-selfcheckgpt",
        }
    }
}

/// Which completion backend serves a solver's model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted OpenAI-compatible chat-completions API
    #[default]
    Online,
    /// Local Ollama server
    Offline,
}

/// Parameters forwarded to every generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Self-RAG beam search knobs.
///
/// The critique weights themselves (w_rel, w_sup, w_use) are fixed in the
/// solver; these are the expansion and pruning controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfRagParams {
    /// Retrieval-necessity pruning threshold
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Beam width
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    /// Maximum beam depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Ignore [Continue to Use Evidence] continuations when scoring
    #[serde(default)]
    pub ignore_cont: bool,
    /// Scoring mode; "adaptive_retrieval" consults the retrieval-necessity
    /// signal, "always_retrieve" conditions every segment on evidence
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_threshold() -> f64 {
    0.2
}

fn default_beam_width() -> usize {
    2
}

fn default_max_depth() -> usize {
    7
}

fn default_mode() -> String {
    "adaptive_retrieval".to_string()
}

impl Default for SelfRagParams {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            beam_width: default_beam_width(),
            max_depth: default_max_depth(),
            ignore_cont: false,
            mode: default_mode(),
        }
    }
}

/// One solver to run against every dataset item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Strategy
    pub method: Method,
    /// Completion backend
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model name ID
    pub model: String,
    /// Number of retrieved documents to show the generator.
    /// Required for the RAG-family methods, validated at solver construction.
    #[serde(default)]
    pub rag_docs_number: Option<usize>,
    /// Generation parameters
    #[serde(default)]
    pub params: GenerationParams,
    /// Self-RAG beam controls (ignored by other methods)
    #[serde(default)]
    pub self_rag: SelfRagParams,
}

/// One dataset to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name ("asqa" or "factscore")
    pub name: String,
    /// Number of items to take, `None` for all
    #[serde(default)]
    pub number: Option<usize>,
    /// Path to the dataset file
    pub path: PathBuf,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// API key environment variable name
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Ollama base URL
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            ollama_base_url: default_ollama_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Datasets to evaluate
    pub datasets: Vec<DatasetConfig>,
    /// Solvers to run
    pub solvers: Vec<SolverConfig>,
    /// Provider endpoints
    #[serde(default)]
    pub providers: ProviderConfig,
    /// Root directory for evaluation records
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl ExperimentConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| Error::config(format!("invalid config {}: {e}", path.display())))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
datasets:
  - name: asqa
    number: 5
    path: data/asqa.json
solvers:
  - method: use-rag
    provider: online
    model: gpt-4o
    rag_docs_number: 5
  - method: direct-answer
    model: gpt-4o
output_dir: out
"#;
        let config: ExperimentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.solvers.len(), 2);
        assert_eq!(config.solvers[0].method, Method::UseRag);
        assert_eq!(config.solvers[0].rag_docs_number, Some(5));
        assert_eq!(config.solvers[1].provider, ProviderKind::Online);
        assert!(config.solvers[1].rag_docs_number.is_none());
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn self_rag_defaults_apply() {
        let yaml = r#"
datasets: []
solvers:
  - method: use-self-rag
    model: selfrag-7b
    rag_docs_number: 5
    self_rag:
      beam_width: 3
"#;
        let config: ExperimentConfig = serde_yaml::from_str(yaml).unwrap();
        let sr = &config.solvers[0].self_rag;
        assert_eq!(sr.beam_width, 3);
        assert_eq!(sr.max_depth, 7);
        assert!(!sr.ignore_cont);
        assert_eq!(sr.mode, "adaptive_retrieval");
    }
}
