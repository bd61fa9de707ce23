//! Provider abstractions for embeddings and LLM generation
//!
//! Trait-based seams so the engine can run against a local Ollama server,
//! an offline hashing embedder, or test doubles.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;

pub use embedding::{BoundedEmbedder, EmbeddingProvider};
pub use hashing::HashingEmbedder;
pub use llm::{FragmentStream, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
