//! LLM provider trait for generating answers

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::GenerationParams;

/// Lazily produced text fragments from a streaming backend
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Trait for LLM-based text generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete answer for a prompt
    async fn generate(&self, prompt: &str, model: &str, params: &GenerationParams) -> Result<String>;

    /// Start a streaming generation
    ///
    /// An `Err` means the backend could not be started; no fragments exist.
    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
