//! Configuration for the RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::DistanceMetric;
use crate::types::GenerationParams;

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Document store configuration
    pub store: StoreConfig,
    /// Prompt template configuration
    pub prompt: PromptConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".to_string()));
        }
        if self.embeddings.max_concurrency == 0 {
            return Err(Error::Config("embeddings.max_concurrency must be positive".to_string()));
        }
        if self.llm.generate_model.trim().is_empty() {
            return Err(Error::Config("llm.generate_model must not be empty".to_string()));
        }
        crate::storage::validate_table_name(&self.store.table_name)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embeddings endpoint
    #[default]
    Ollama,
    /// Local feature-hashing embedder (no model required)
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub provider: EmbeddingBackend,
    /// Model to use (default: nomic-embed-text)
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Maximum embedding calls in flight across ingestion and queries
    pub max_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            max_concurrency: num_cpus::get().clamp(1, 4),
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model used when a query names none
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: Option<f32>,
    /// Top-k sampling
    pub top_k: Option<u32>,
    /// Maximum tokens to generate
    pub max_length: Option<u32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.0,
            top_p: None,
            top_k: None,
            max_length: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Default generation parameters
    pub fn default_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: Some(self.temperature),
            top_p: self.top_p,
            top_k: self.top_k,
            max_length: self.max_length,
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub storage_path: PathBuf,
    /// Document table name
    pub table_name: String,
    /// Ranking metric, fixed for the lifetime of the table
    pub metric: DistanceMetric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data").join("documents.db"),
            table_name: "vector_search".to_string(),
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Language the answer must be written in
    pub language: String,
    /// Reply used when the context does not contain the answer
    pub decline_phrase: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            decline_phrase: "I cannot answer this question based on the available documents."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RagConfig::from_toml(
            r#"
            [embeddings]
            provider = "hashing"
            dimensions = 64

            [store]
            metric = "euclidean"
            "#,
        )
        .unwrap();

        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hashing);
        assert_eq!(config.embeddings.dimensions, 64);
        assert_eq!(config.embeddings.model, "nomic-embed-text");
        assert_eq!(config.store.metric, DistanceMetric::Euclidean);
        assert_eq!(config.store.table_name, "vector_search");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_rejects_bad_table_name() {
        let err = RagConfig::from_toml(
            r#"
            [store]
            table_name = "docs; DROP TABLE x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let err = RagConfig::from_toml("[embeddings]\ndimensions = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
