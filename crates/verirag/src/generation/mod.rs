//! Generation boundary: completion providers and prompt assembly

pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod provider;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use prompt::PromptAssembler;
pub use provider::{CompletionProvider, ProviderCache};
