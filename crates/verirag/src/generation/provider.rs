//! Completion provider trait and the explicit provider cache

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::{GenerationParams, ProviderConfig, ProviderKind};
use crate::error::Result;

use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;

/// Black-box text completion.
///
/// Ordinary model refusals are valid text and must not error; only
/// transport-level failures (timeout, auth, malformed response) return
/// `Error::Transport`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a prompt, returning the generated text
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Model being served
    fn model(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Explicit cache of constructed providers, keyed by `(kind, model)`.
///
/// Replaces implicit memoization: the cache is an object passed into solver
/// construction, and entries live exactly as long as the cache does.
pub struct ProviderCache {
    config: ProviderConfig,
    entries: RwLock<HashMap<(ProviderKind, String), Arc<dyn CompletionProvider>>>,
}

impl ProviderCache {
    /// Create an empty cache over the given endpoints
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get or construct the provider for `(kind, model)`
    pub fn get(&self, kind: ProviderKind, model: &str) -> Result<Arc<dyn CompletionProvider>> {
        let key = (kind, model.to_string());

        if let Some(provider) = self.entries.read().get(&key) {
            return Ok(Arc::clone(provider));
        }

        let provider: Arc<dyn CompletionProvider> = match kind {
            ProviderKind::Online => Arc::new(OpenAiProvider::new(&self.config, model)?),
            ProviderKind::Offline => Arc::new(OllamaProvider::new(&self.config, model)?),
        };

        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_insert_with(|| Arc::clone(&provider));
        Ok(Arc::clone(entry))
    }

    /// Number of constructed providers
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether any provider has been constructed yet
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
